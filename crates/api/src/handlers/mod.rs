pub mod cards;
pub mod due;
pub mod folders;
pub mod settings;
pub mod sync;
