//! Result Projector Service
//!
//! Pure domain logic for merging batch outcomes back onto the caller's
//! positional rows. This service has NO external dependencies.

use crate::domain::entities::ResolutionOutcome;
use crate::domain::value_objects::Address;

/// Outcome of projecting a batch onto existing geocoding fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    /// Rows resolved in this run
    pub success_count: usize,
    /// Rows attempted in this run and not resolved
    pub failure_count: usize,
    /// Rows not attempted (blank address or cancelled before reaching them)
    pub skipped_count: usize,
    /// New geocoding field per row, aligned with the input
    pub fields: Vec<Option<String>>,
}

/// Merges a sparse set of resolutions into a positional column.
///
/// The projector only ever writes cells it resolved in this run:
/// - `Resolved` rows get `"<lat>,<lng>"`
/// - `Skipped` rows keep their original value
/// - `Failed` rows are not filled, so a blank cell stays blank and a
///   pre-existing value (e.g. entered by hand) is left alone
pub struct ResultProjector;

impl ResultProjector {
    /// Project `outcomes` onto `existing`.
    ///
    /// `existing` may be shorter than `outcomes` (missing cells count as
    /// empty). The returned `fields` always has one entry per outcome.
    pub fn project(outcomes: &[ResolutionOutcome], existing: &[Option<String>]) -> Projection {
        let mut projection = Projection {
            fields: Vec::with_capacity(outcomes.len()),
            ..Default::default()
        };

        for (i, outcome) in outcomes.iter().enumerate() {
            let previous = existing.get(i).cloned().flatten();
            let field = match outcome {
                ResolutionOutcome::Resolved(location) => {
                    projection.success_count += 1;
                    Some(location.to_field())
                }
                ResolutionOutcome::Failed(_) => {
                    projection.failure_count += 1;
                    previous
                }
                ResolutionOutcome::Skipped => {
                    projection.skipped_count += 1;
                    previous
                }
            };
            projection.fields.push(field);
        }

        projection
    }

    /// 1-based rows that carry an address but still have no coordinates.
    ///
    /// This is the "needs manual correction" list: it looks at the projected
    /// column, not at this run's outcomes, so rows that failed in an earlier
    /// run and were skipped now are reported too, while rows with a
    /// pre-filled value are treated as done.
    pub fn unresolved_rows(addresses: &[Address], fields: &[Option<String>]) -> Vec<usize> {
        addresses
            .iter()
            .enumerate()
            .filter(|(i, address)| {
                let filled = fields
                    .get(*i)
                    .and_then(|f| f.as_deref())
                    .map(|f| !f.trim().is_empty())
                    .unwrap_or(false);
                !address.is_blank() && !filled
            })
            .map(|(i, _)| i + 1)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ResolvedLocation;
    use crate::domain::errors::LookupError;

    fn resolved(lat: f64, lng: f64) -> ResolutionOutcome {
        ResolutionOutcome::Resolved(ResolvedLocation::new(lat, lng, "x").unwrap())
    }

    fn failed() -> ResolutionOutcome {
        ResolutionOutcome::Failed(LookupError::NotFound)
    }

    #[test]
    fn test_project_counts() {
        let outcomes = vec![
            ResolutionOutcome::Skipped,
            resolved(37.5663, 126.9779),
            resolved(37.5663, 126.9779),
            failed(),
        ];

        let projection = ResultProjector::project(&outcomes, &[]);

        assert_eq!(projection.success_count, 2);
        assert_eq!(projection.failure_count, 1);
        assert_eq!(projection.skipped_count, 1);
        assert_eq!(projection.fields.len(), 4);
    }

    #[test]
    fn test_project_writes_resolved_coordinates() {
        let projection = ResultProjector::project(&[resolved(37.5663, 126.9779)], &[None]);
        assert_eq!(projection.fields, vec![Some("37.5663,126.9779".to_string())]);
    }

    #[test]
    fn test_project_overwrites_stale_value_on_resolve() {
        let existing = vec![Some("1,1".to_string())];
        let projection = ResultProjector::project(&[resolved(2.0, 3.0)], &existing);
        assert_eq!(projection.fields[0].as_deref(), Some("2.0,3.0"));
    }

    #[test]
    fn test_project_preserves_skipped_values() {
        let existing = vec![Some("37.36,126.93".to_string()), None];
        let outcomes = vec![ResolutionOutcome::Skipped, ResolutionOutcome::Skipped];

        let projection = ResultProjector::project(&outcomes, &existing);

        assert_eq!(projection.fields, existing);
    }

    #[test]
    fn test_project_never_overwrites_failed_rows() {
        let existing = vec![Some("37.36,126.93".to_string()), None, Some(String::new())];
        let outcomes = vec![failed(), failed(), failed()];

        let projection = ResultProjector::project(&outcomes, &existing);

        assert_eq!(projection.fields, existing);
        assert_eq!(projection.failure_count, 3);
    }

    #[test]
    fn test_project_short_existing_column() {
        let outcomes = vec![ResolutionOutcome::Skipped, failed()];
        let projection = ResultProjector::project(&outcomes, &[Some("a".to_string())]);
        assert_eq!(projection.fields, vec![Some("a".to_string()), None]);
    }

    #[test]
    fn test_project_empty() {
        let projection = ResultProjector::project(&[], &[]);
        assert_eq!(projection, Projection::default());
    }

    #[test]
    fn test_unresolved_rows_lists_addresses_without_coordinates() {
        let addresses: Vec<Address> = vec!["", "Seoul City Hall", "Nowhere", "Manual"]
            .into_iter()
            .map(Address::from)
            .collect();
        let fields = vec![
            None,
            Some("37.5663,126.9779".to_string()),
            Some("  ".to_string()),
            Some("37.0,127.0".to_string()),
        ];

        assert_eq!(ResultProjector::unresolved_rows(&addresses, &fields), vec![3]);
    }

    #[test]
    fn test_unresolved_rows_missing_field_counts_as_blank() {
        let addresses = vec![Address::from("a"), Address::from("b")];
        assert_eq!(ResultProjector::unresolved_rows(&addresses, &[]), vec![1, 2]);
    }
}
