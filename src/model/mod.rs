pub use self::codes::Codes;
pub use self::student::{Aggregate, Sex, StudentRecord};

mod codes;
mod student;
