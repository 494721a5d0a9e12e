// Core models
pub mod cart;
pub mod checkout_form;
pub mod order;
pub mod payment;
pub mod settings;

pub use cart::{CartLineItem, OrderTotals, RawCartEntry};
pub use checkout_form::{CheckoutForm, FormErrors, FormField};
pub use order::{NewOrder, NewOrderItem, Order, OrderPayload, OrderStatus};
pub use payment::{
    FinalizeOutcome, InitiatePaymentRequest, InitiatePaymentResponse, PaymentMethod,
    PaymentRecord, PaymentStatus, PaymentStatusQuery, PaymentStatusResponse,
};
pub use settings::{CheckoutAvailability, OrderingFlags};
