pub mod annotation;
pub mod store;
pub mod unit;

pub use annotation::{Annotation, AnnotationId, LineRange, SelectionAnchor, Target, TextSelection};
pub use store::AnnotationStore;
pub use unit::{Unit, UnitKind};
