//! Order and sample types for the lab workflow.
//!
//! An order tracks a customer's test request through a fixed status
//! lifecycle: reviewing -> approved -> kit-sent -> kit-arrived. Each
//! physical sample attached to an order moves through its own
//! processing lifecycle independently of the order status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an order in the portal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
	/// Order has been placed and is awaiting admin review.
	Reviewing,
	/// Order has been approved and lab entities are provisioned.
	Approved,
	/// Sampling kit has been dispatched to the customer.
	KitSent,
	/// Customer has confirmed the kit arrived.
	KitArrived,
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::Reviewing => write!(f, "reviewing"),
			OrderStatus::Approved => write!(f, "approved"),
			OrderStatus::KitSent => write!(f, "kit-sent"),
			OrderStatus::KitArrived => write!(f, "kit-arrived"),
		}
	}
}

/// Processing status of a sample that the customer has returned.
///
/// A sample awaiting return has no explicit status; it is represented
/// by membership in the order's `unsubmitted_samples` list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SampleStatus {
	/// Sample has been physically returned to the lab.
	SampleReturned,
	/// Sample is being processed.
	Processing,
	/// Processing finished and the individual report is available.
	Complete,
}

/// Test service type, derived from a sample identifier segment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServiceType {
	#[serde(rename = "qPCR")]
	Qpcr,
	#[serde(rename = "metagenomics")]
	Metagenomics,
	#[serde(rename = "genome-sequencing")]
	GenomeSequencing,
	#[serde(rename = "unknown")]
	Unknown,
}

impl ServiceType {
	/// Derives the service type from a sample name.
	///
	/// Sample identifiers carry a service code segment after the
	/// registry prefix (e.g. "AQS-QPCR-0012"). The first segment that
	/// matches a known code wins; names without one map to `Unknown`.
	pub fn from_sample_name(name: &str) -> Self {
		for segment in name.split('-') {
			match segment.to_ascii_uppercase().as_str() {
				"QPCR" => return ServiceType::Qpcr,
				"MTG" => return ServiceType::Metagenomics,
				"GS" => return ServiceType::GenomeSequencing,
				_ => {},
			}
		}
		ServiceType::Unknown
	}
}

impl fmt::Display for ServiceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ServiceType::Qpcr => write!(f, "qPCR"),
			ServiceType::Metagenomics => write!(f, "metagenomics"),
			ServiceType::GenomeSequencing => write!(f, "genome-sequencing"),
			ServiceType::Unknown => write!(f, "unknown"),
		}
	}
}

/// A single physical specimen attached to an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
	/// Sample identifier, unique within the order.
	pub name: String,
	/// Processing status; `None` while awaiting return.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub status: Option<SampleStatus>,
	/// Test service this sample was ordered for.
	pub service: ServiceType,
	/// URL of the individual sample report, set alongside `Complete`.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub report_url: Option<String>,
	/// Unix timestamp of the last status-affecting mutation.
	pub last_updated: u64,
}

/// Descriptor of a sample requested on or provisioned for an order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderedSample {
	/// Sample name, unique within the order.
	pub name: String,
	/// Requested test service.
	pub service: ServiceType,
	/// Registry identifier assigned by the external lab system once
	/// provisioning completes.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub registry_id: Option<String>,
}

/// A report document attached to an order after completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderReport {
	pub filename: String,
	pub download_url: String,
}

/// A customer's request for one or more lab tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Unique order identifier.
	pub id: String,
	/// Owning customer; immutable after creation.
	pub user_id: String,
	/// Current lifecycle status.
	pub status: OrderStatus,
	/// Timestamp when this order was created.
	pub created_at: u64,
	/// Timestamp when this order was last updated.
	pub updated_at: u64,
	/// Samples requested at order time; input to provisioning.
	#[serde(default)]
	pub requested_samples: Vec<OrderedSample>,
	/// Sample descriptors populated once provisioning completes.
	/// Set at most once per order.
	#[serde(default)]
	pub ordered_samples: Vec<OrderedSample>,
	/// Samples the customer has not yet physically returned.
	#[serde(default)]
	pub unsubmitted_samples: Vec<Sample>,
	/// Samples the customer has returned to the lab.
	#[serde(default)]
	pub submitted_samples: Vec<Sample>,
	/// External provisioning task ids; persisted before polling so a
	/// retried approval never re-issues provisioning requests.
	#[serde(default)]
	pub task_ids: Vec<String>,
	/// Order-level report documents attached post-completion.
	#[serde(default)]
	pub order_reports: Vec<OrderReport>,
	/// Timestamp stamped atomically with the kit-sent transition.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub dispatched_at: Option<u64>,
}

impl Order {
	/// Creates a new order in the reviewing state.
	pub fn new(
		id: impl Into<String>,
		user_id: impl Into<String>,
		requested_samples: Vec<OrderedSample>,
		created_at: u64,
	) -> Self {
		Self {
			id: id.into(),
			user_id: user_id.into(),
			status: OrderStatus::Reviewing,
			created_at,
			updated_at: created_at,
			requested_samples,
			ordered_samples: Vec::new(),
			unsubmitted_samples: Vec::new(),
			submitted_samples: Vec::new(),
			task_ids: Vec::new(),
			order_reports: Vec::new(),
			dispatched_at: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_service_type_from_sample_name() {
		assert_eq!(
			ServiceType::from_sample_name("AQS-QPCR-0012"),
			ServiceType::Qpcr
		);
		assert_eq!(
			ServiceType::from_sample_name("AQS-MTG-0003"),
			ServiceType::Metagenomics
		);
		assert_eq!(
			ServiceType::from_sample_name("AQS-GS-0100"),
			ServiceType::GenomeSequencing
		);
		assert_eq!(
			ServiceType::from_sample_name("AQS-0042"),
			ServiceType::Unknown
		);
		// Case-insensitive on the code segment
		assert_eq!(
			ServiceType::from_sample_name("aqs-qpcr-7"),
			ServiceType::Qpcr
		);
	}

	#[test]
	fn test_order_status_serde_kebab_case() {
		assert_eq!(
			serde_json::to_string(&OrderStatus::KitSent).unwrap(),
			"\"kit-sent\""
		);
		let status: OrderStatus = serde_json::from_str("\"kit-arrived\"").unwrap();
		assert_eq!(status, OrderStatus::KitArrived);
	}

	#[test]
	fn test_sample_status_serde() {
		assert_eq!(
			serde_json::to_string(&SampleStatus::SampleReturned).unwrap(),
			"\"sample-returned\""
		);
	}

	#[test]
	fn test_new_order_starts_in_reviewing() {
		let order = Order::new("ord-1", "user-1", Vec::new(), 1_700_000_000);
		assert_eq!(order.status, OrderStatus::Reviewing);
		assert!(order.ordered_samples.is_empty());
		assert!(order.task_ids.is_empty());
		assert!(order.dispatched_at.is_none());
	}
}
