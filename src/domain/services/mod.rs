pub mod identity_provider;
pub mod role_mapper;
pub mod token_service;
