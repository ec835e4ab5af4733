mod issuance;

#[cfg(feature = "integration-tests")]
mod live;
