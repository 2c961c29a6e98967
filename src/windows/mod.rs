pub mod pet_window;

pub use pet_window::{PetWindow, WindowError};
