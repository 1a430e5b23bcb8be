// storefront/src/models/review.rs

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reports at which a review is pulled from public listings.
pub const REPORT_THRESHOLD: i32 = 3;
pub const MAX_COMMENT_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
  pub id: Uuid,
  pub product_id: Uuid,
  pub user_id: Option<Uuid>,
  pub author_name: String,
  pub rating: i16,
  pub comment: String,
  pub is_verified_purchase: bool,
  pub is_approved: bool,
  pub helpful_count: i32,
  #[serde(skip_serializing)]
  pub helpful_by: Vec<Uuid>,
  pub report_count: i32,
  #[serde(skip_serializing)]
  pub reported_by: Vec<Uuid>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
  pub rating: i16,
  pub comment: String,
  pub author_name: Option<String>,
}

impl Review {
  pub fn write(
    product_id: Uuid,
    user_id: Option<Uuid>,
    fallback_author: Option<String>,
    new: NewReview,
    is_verified_purchase: bool,
    now: DateTime<Utc>,
  ) -> Result<Self, AppError> {
    if !(1..=5).contains(&new.rating) {
      return Err(AppError::Validation("Rating must be between 1 and 5".to_string()));
    }
    let comment = new.comment.trim().to_string();
    if comment.is_empty() {
      return Err(AppError::Validation("Review comment is required".to_string()));
    }
    if comment.chars().count() > MAX_COMMENT_LEN {
      return Err(AppError::Validation(format!(
        "Review comment must be at most {} characters",
        MAX_COMMENT_LEN
      )));
    }
    let author_name = new
      .author_name
      .or(fallback_author)
      .map(|n| n.trim().to_string())
      .filter(|n| !n.is_empty())
      .unwrap_or_else(|| "Anonymous".to_string());

    Ok(Self {
      id: Uuid::new_v4(),
      product_id,
      user_id,
      author_name,
      rating: new.rating,
      comment,
      is_verified_purchase,
      is_approved: true,
      helpful_count: 0,
      helpful_by: Vec::new(),
      report_count: 0,
      reported_by: Vec::new(),
      created_at: now,
      updated_at: now,
    })
  }

  /// Counts a helpful vote once per user. Returns whether it was counted.
  pub fn mark_helpful(&mut self, user_id: Uuid, now: DateTime<Utc>) -> bool {
    if self.helpful_by.contains(&user_id) {
      return false;
    }
    self.helpful_by.push(user_id);
    self.helpful_count += 1;
    self.updated_at = now;
    true
  }

  /// Counts a report once per user and unapproves the review at the threshold.
  pub fn report(&mut self, user_id: Uuid, now: DateTime<Utc>) -> bool {
    if self.reported_by.contains(&user_id) {
      return false;
    }
    self.reported_by.push(user_id);
    self.report_count += 1;
    if self.report_count >= REPORT_THRESHOLD {
      self.is_approved = false;
    }
    self.updated_at = now;
    true
  }
}

/// Rounded average and count over approved reviews.
pub fn rating_summary<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> (f64, i32) {
  let (sum, count) = reviews
    .into_iter()
    .filter(|r| r.is_approved)
    .fold((0i64, 0i32), |(sum, count), r| (sum + i64::from(r.rating), count + 1));
  if count == 0 {
    return (0.0, 0);
  }
  let average = sum as f64 / f64::from(count);
  ((average * 10.0).round() / 10.0, count)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn review(rating: i16) -> Review {
    Review::write(
      Uuid::new_v4(),
      None,
      None,
      NewReview {
        rating,
        comment: "Lovely cake".to_string(),
        author_name: None,
      },
      false,
      Utc::now(),
    )
    .unwrap()
  }

  #[test]
  fn rating_must_be_in_range() {
    let result = Review::write(
      Uuid::new_v4(),
      None,
      None,
      NewReview {
        rating: 6,
        comment: "Too good".to_string(),
        author_name: None,
      },
      false,
      Utc::now(),
    );

    assert!(matches!(result, Err(AppError::Validation(_))));
  }

  #[test]
  fn anonymous_author_by_default() {
    assert_eq!(review(5).author_name, "Anonymous");
  }

  #[test]
  fn helpful_votes_are_deduplicated() {
    let mut review = review(4);
    let voter = Uuid::new_v4();

    assert!(review.mark_helpful(voter, Utc::now()));
    assert!(!review.mark_helpful(voter, Utc::now()));
    assert_eq!(review.helpful_count, 1);
  }

  #[test]
  fn third_distinct_report_unapproves() {
    let mut review = review(1);
    let first = Uuid::new_v4();

    review.report(first, Utc::now());
    review.report(first, Utc::now());
    review.report(Uuid::new_v4(), Utc::now());
    assert!(review.is_approved);

    review.report(Uuid::new_v4(), Utc::now());
    assert!(!review.is_approved);
    assert_eq!(review.report_count, 3);
  }

  #[test]
  fn summary_ignores_unapproved() {
    let mut hidden = review(1);
    hidden.is_approved = false;
    let reviews = vec![review(5), review(4), hidden];

    assert_eq!(rating_summary(&reviews), (4.5, 2));
  }
}
