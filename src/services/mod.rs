pub mod billing_policy;
pub mod booking_directory;
pub mod clock;
pub mod due_poller;
pub mod due_window;
pub mod money;
pub mod notification_dedup;
pub mod payment_ledger;
pub mod payment_overview;
pub mod pricing;
pub mod reconciliation;
pub mod settled;
pub mod settlement;
pub mod stay_duration;

#[cfg(test)]
pub mod test_support;
