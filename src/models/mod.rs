pub mod basket;
pub mod paper;
pub mod paper_card;
pub mod query_bundle;
pub mod review;

pub use basket::Basket;
pub use paper::Paper;
pub use paper_card::{PaperCard, MAX_KEYWORDS};
pub use query_bundle::{QueryBundle, Strategy};
pub use review::{Reference, Review, ReviewSection};
