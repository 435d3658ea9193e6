pub mod field;
pub mod form;
pub mod rule;
pub mod step;

pub use field::{ChoiceOption, FieldKind, FieldSpec};
pub use form::{FormSpec, SpecError};
pub use rule::{Check, RuleSpec};
pub use step::StepSpec;
