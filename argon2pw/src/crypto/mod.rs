//! Password hashing and the pieces it is built from. The PHC codec, the
//! decimal parser and the random source are separate modules so each can be
//! reviewed and tested on its own.

pub mod decimal;
pub mod passwords;
pub mod phc;
pub mod random;
