mod favorites;
mod token;

pub use favorites::FavoritesRegistry;
pub use token::FileTokenPersistence;
pub use token::MemoryTokenPersistence;
pub use token::TokenPersistence;
pub use token::TokenStore;
