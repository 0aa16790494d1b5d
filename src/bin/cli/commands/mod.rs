pub mod card;
pub mod deck;
pub mod review;
pub mod status;
