pub mod repository;

pub use repository::WalletRepository;
