// Pure checkout rules
pub mod pricing;

// Shared persistence and confirmation steps
pub mod lifecycle;

// Order and payment flows
pub mod orders;
pub mod payments;
