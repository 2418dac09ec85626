//! Tools exposed to the agents.
//!
//! | Tool              | Agent    | Effect                          |
//! |-------------------|----------|---------------------------------|
//! | `list_typologies` | delegate | read typology store             |
//! | `get_typology`    | delegate | read typology store             |
//! | `save_finding`    | delegate | write finding store             |
//! | `analyze_pattern` | primary  | run the delegate agent          |

pub mod delegation;
pub mod persist;
pub mod typology;

pub use delegation::DelegationTool;
pub use persist::{SaveFindingTool, SaveOutcome};
pub use typology::{GetTypologyTool, ListTypologiesTool};
