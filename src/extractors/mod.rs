pub mod goodreturns;

pub use goodreturns::GoodReturnsExtractor;
