pub mod cart;
pub mod checkout;
pub mod fulfillment;
pub mod manager;
pub mod models;
pub mod orchestrator;
pub mod refund;
pub mod repository;
pub mod settlement;
pub mod views;

pub use cart::{Cart, CartItem, CartOwner};
pub use checkout::CheckoutService;
pub use fulfillment::PartnerAssignmentService;
pub use manager::OrderManager;
pub use models::{
    Actor, DeliveryAddress, Invoice, Order, OrderItem, OrderStatus, OrderStatusHistory,
    PartnerAssignment, PartnerOrderStatus, Payment, PaymentStatus, Refund, RefundStatus,
    Settlement, SettlementOrder, SettlementStatus,
};
pub use orchestrator::PaymentOrchestrator;
pub use refund::RefundProcessor;
pub use settlement::SettlementBatcher;
pub use views::{ClientOrderView, InternalOrderView};
