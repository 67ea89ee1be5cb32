use mothball_core::{AppError, AppResult};

/// A virtual machine resolved to a live provider resource.
///
/// Lives only for the duration of one pipeline run and is never persisted.
/// The owning resource group is always re-derived from the canonical id
/// rather than trusted from the original request, which guards against stale
/// or mistyped caller-supplied group names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVm {
    /// Fully-qualified resource id, e.g.
    /// `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Compute/virtualMachines/{vm}`.
    pub id: String,
    /// Provider-reported virtual machine name.
    pub name: String,
}

impl ResolvedVm {
    /// Extracts the resource group token from the canonical resource id.
    ///
    /// Canonical ids are `/subscriptions/{sub}/resourceGroups/{rg}/...`; the
    /// segment markers are matched case-insensitively because the provider
    /// does not guarantee casing.
    pub fn resource_group(&self) -> AppResult<&str> {
        let mut segments = self.id.split('/');
        // A canonical id starts with '/', so the first segment is empty.
        let leading = segments.next();
        let subscriptions_marker = segments.next();
        let _subscription_id = segments.next();
        let groups_marker = segments.next();
        let group = segments.next();

        match (leading, subscriptions_marker, groups_marker, group) {
            (Some(""), Some(subscriptions), Some(groups), Some(group))
                if subscriptions.eq_ignore_ascii_case("subscriptions")
                    && groups.eq_ignore_ascii_case("resourcegroups")
                    && !group.is_empty() =>
            {
                Ok(group)
            }
            _ => Err(AppError::Provider(format!(
                "resource id '{}' carries no resource group segment",
                self.id
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ResolvedVm;

    fn resolved(id: &str) -> ResolvedVm {
        ResolvedVm {
            id: id.to_owned(),
            name: "vm1".to_owned(),
        }
    }

    #[test]
    fn derives_the_resource_group_from_a_canonical_id() {
        let vm = resolved(
            "/subscriptions/sub-1/resourceGroups/rg-prod/providers/Microsoft.Compute/virtualMachines/vm1",
        );
        assert_eq!(vm.resource_group().ok(), Some("rg-prod"));
    }

    #[test]
    fn accepts_lowercased_segment_markers() {
        let vm = resolved("/subscriptions/sub-1/resourcegroups/rg-a/providers/x/y/vm1");
        assert_eq!(vm.resource_group().ok(), Some("rg-a"));
    }

    #[test]
    fn rejects_an_id_without_a_group_segment() {
        let vm = resolved("/subscriptions/sub-1");
        assert!(vm.resource_group().is_err());
    }

    #[test]
    fn rejects_an_id_with_misplaced_markers() {
        let vm = resolved("subscriptions/sub-1/resourceGroups/rg-a/providers/x");
        assert!(vm.resource_group().is_err());
    }

    #[test]
    fn rejects_an_empty_group_token() {
        let vm = resolved("/subscriptions/sub-1/resourceGroups//providers/x");
        assert!(vm.resource_group().is_err());
    }
}
