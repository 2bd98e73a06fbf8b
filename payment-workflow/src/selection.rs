use std::collections::HashSet;

use billing_client::Bill;
use rust_decimal::Decimal;
use uuid::Uuid;

/// In-memory set of candidate bills and the subset chosen for payment.
///
/// Invariant: the selected set is always a subset of the loaded bills, and
/// the derived total always equals the sum over the selected bills — both
/// are recomputed from the bill list on read, never cached.
#[derive(Debug, Default)]
pub struct BillSelection {
    bills: Vec<Bill>,
    selected: HashSet<Uuid>,
}

impl BillSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the candidate bills.
    ///
    /// Every incoming bill starts out selected. "All selected by default"
    /// is the product decision for this flow, not an accident of
    /// initialization.
    pub fn set_bills(&mut self, bills: Vec<Bill>) {
        self.selected = bills.iter().map(|bill| bill.id).collect();
        self.bills = bills;
    }

    /// Flip a bill in or out of the payable subset; unknown ids are a no-op
    pub fn toggle(&mut self, bill_id: Uuid) {
        if !self.bills.iter().any(|bill| bill.id == bill_id) {
            return;
        }
        if !self.selected.remove(&bill_id) {
            self.selected.insert(bill_id);
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.bills.iter().map(|bill| bill.id).collect();
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    pub fn bills(&self) -> &[Bill] {
        &self.bills
    }

    pub fn is_selected(&self, bill_id: Uuid) -> bool {
        self.selected.contains(&bill_id)
    }

    /// Selected bills in the order they were fetched
    pub fn selected_bills(&self) -> Vec<&Bill> {
        self.bills
            .iter()
            .filter(|bill| self.selected.contains(&bill.id))
            .collect()
    }

    /// Ids of the selected bills, in fetch order
    pub fn selected_ids(&self) -> Vec<Uuid> {
        self.bills
            .iter()
            .filter(|bill| self.selected.contains(&bill.id))
            .map(|bill| bill.id)
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Sum of the selected bill amounts, recomputed on every call
    pub fn selected_total(&self) -> Decimal {
        self.bills
            .iter()
            .filter(|bill| self.selected.contains(&bill.id))
            .map(|bill| bill.amount)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bills.is_empty()
    }
}
