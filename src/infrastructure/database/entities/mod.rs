//! Database entities module

pub mod charger;
pub mod charging_point;
pub mod charging_session;
pub mod driver_account;
pub mod enterprise_invoice;
pub mod facility;
pub mod invoice;
pub mod plan_benefit;
pub mod plan_registration;
pub mod reservation;
pub mod station;
pub mod subscription_plan;

pub use charger::Entity as Charger;
pub use charging_point::Entity as ChargingPoint;
pub use charging_session::Entity as ChargingSession;
pub use driver_account::Entity as DriverAccount;
pub use enterprise_invoice::Entity as EnterpriseInvoice;
pub use facility::Entity as Facility;
pub use invoice::Entity as Invoice;
pub use plan_benefit::Entity as PlanBenefit;
pub use plan_registration::Entity as PlanRegistration;
pub use reservation::Entity as Reservation;
pub use station::Entity as Station;
pub use subscription_plan::Entity as SubscriptionPlan;
