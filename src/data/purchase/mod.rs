use chrono::{DateTime, Utc};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::course::Course;

pub mod db;

pub static PURCHASE_COLLECTION_NAME: &str = "purchases";

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Failed,
}

/// Audit record of an enrollment and the amount it was worth at the time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Purchase {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub amount: f64,
    pub status: PurchaseStatus,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl Purchase {
    /// Enrollment currently never waits on a payment provider, so the record
    /// is written as already completed.
    pub fn completed(user_id: Uuid, course: &Course) -> Purchase {
        Purchase {
            id: Uuid::new_v4(),
            user_id,
            course_id: course.id,
            amount: course.amount_due(),
            status: PurchaseStatus::Completed,
            created: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::course::fixtures;

    #[test]
    fn completed_purchase_records_discounted_amount() {
        let course = fixtures::course(Uuid::new_v4(), &[1]);
        let user = Uuid::new_v4();
        let purchase = Purchase::completed(user, &course);

        assert_eq!(purchase.amount, 90.0);
        assert_eq!(purchase.status, PurchaseStatus::Completed);
        assert_eq!(purchase.course_id, course.id);
        assert_eq!(purchase.user_id, user);
    }
}
