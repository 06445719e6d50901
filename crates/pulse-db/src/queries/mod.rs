pub mod requests;
pub mod responses;
pub mod sessions;
pub mod stats;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support;
