pub mod courses;
pub mod donations;
pub mod models;
pub mod notes;
pub mod reviews;
pub mod transactions;
pub mod users;

pub use courses::CourseRepository;
pub use donations::DonationRepository;
pub use models::{
    Course, Donation, Note, NoteListing, NoteStatus, PublicUser, Review, Transaction,
    TransactionStatus, User,
};
pub use notes::NoteRepository;
pub use reviews::ReviewRepository;
pub use transactions::TransactionRepository;
pub use users::UserRepository;
