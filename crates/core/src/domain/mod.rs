pub mod card;
pub mod choice;
pub mod document;
pub mod turn;
