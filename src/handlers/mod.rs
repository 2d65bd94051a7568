pub mod dictation;
pub mod pages;
pub mod session;
pub mod talk;
