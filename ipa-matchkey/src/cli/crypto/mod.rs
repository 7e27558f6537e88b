mod decrypt;
mod encrypt;
mod keygen;

pub use decrypt::DecryptArgs;
pub use encrypt::EncryptArgs;
pub use keygen::KeygenArgs;
