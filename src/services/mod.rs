//! Background services behind the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! `index` lists the bucket once at startup and keeps the image key set;
//! `prefetch` keeps a queue of random images ready for `/random`.

pub mod index;
pub mod prefetch;
