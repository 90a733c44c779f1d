pub mod events;
pub mod photos;

pub use events::EventsRepository;
pub use photos::PhotosRepository;
