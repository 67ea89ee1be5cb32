use mothball_core::{AppError, AppResult};
use serde_json::Value;

/// One virtual machine reference submitted for decommissioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRef {
    /// Virtual machine name within its resource group.
    pub name: String,
    /// Resource group the caller believes owns the machine.
    pub resource_group: String,
}

/// Validated decommission request.
///
/// An empty `vm_list` is legal and makes the whole request a no-op. `days`
/// carries no range validation: zero and negative values are accepted and
/// simply move the remove date to or before the creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecommissionRequest {
    /// Subscription scope for every lookup in the batch.
    pub subscription_id: String,
    /// Ordered batch of virtual machines to process.
    pub vm_list: Vec<VmRef>,
    /// Free-text change justification; doubles as the audit partition key.
    pub change: String,
    /// Retention period in days before the batch is eligible for removal.
    pub days: i64,
}

impl DecommissionRequest {
    /// Validates a raw request body into a typed request.
    ///
    /// Rules are checked in a fixed order and the first violation wins: the
    /// body must parse as a JSON object, `subscriptionId` must be a non-empty
    /// string, `vmList` must be an array, `change` must be a string, `days`
    /// must be an integer, and every `vmList` element must carry non-empty
    /// `name` and `resourceGroup` strings. Pure function of the input.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let body: Value = serde_json::from_str(raw)
            .map_err(|error| AppError::MalformedInput(error.to_string()))?;
        let body = body
            .as_object()
            .ok_or_else(|| AppError::MalformedInput("expected a JSON object".to_owned()))?;

        let subscription_id = body
            .get("subscriptionId")
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .ok_or(AppError::MissingField {
                field: "subscriptionId",
                expected: "a non-empty string",
            })?;

        let vm_items = body
            .get("vmList")
            .and_then(Value::as_array)
            .ok_or(AppError::MissingField {
                field: "vmList",
                expected: "a list",
            })?;

        let change = body
            .get("change")
            .and_then(Value::as_str)
            .ok_or(AppError::MissingField {
                field: "change",
                expected: "a string",
            })?;

        let days = body
            .get("days")
            .and_then(Value::as_i64)
            .ok_or(AppError::MissingField {
                field: "days",
                expected: "an integer",
            })?;

        let mut vm_list = Vec::with_capacity(vm_items.len());
        for (index, item) in vm_items.iter().enumerate() {
            let vm_ref = item
                .as_object()
                .and_then(|entry| {
                    let name = entry.get("name").and_then(Value::as_str)?;
                    let resource_group = entry.get("resourceGroup").and_then(Value::as_str)?;
                    (!name.is_empty() && !resource_group.is_empty()).then(|| VmRef {
                        name: name.to_owned(),
                        resource_group: resource_group.to_owned(),
                    })
                })
                .ok_or(AppError::InvalidListItem { index })?;
            vm_list.push(vm_ref);
        }

        Ok(Self {
            subscription_id: subscription_id.to_owned(),
            vm_list,
            change: change.to_owned(),
            days,
        })
    }
}
