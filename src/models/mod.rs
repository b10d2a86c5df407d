pub mod order;

pub use order::{
    BankDetails, BankTransferInstructions, LineItem, OrderStatus, PaymentMethod,
};
