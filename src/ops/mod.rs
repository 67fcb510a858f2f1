pub mod combination;
pub mod field;
pub mod inner_product;
pub mod template;

pub use self::combination::{linear_combinations, validate_indices};
pub use self::field::{DotProduct, Field, InnerProduct};
pub use self::inner_product::inner_product_matrix;
pub use self::template::ModeTemplate;
