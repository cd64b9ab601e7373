//! Pure derivation of the visible list from the raw catalog.
//!
//! Steps, in order: overlay liked flags, filter, stable sort, then resolve the
//! previous selection against the filtered list.

use std::collections::BTreeSet;

use crate::state::{Settings, SortOption};
use crate::{MovieId, MovieRecord, MovieView};

/// Output of [`project`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub visible: Vec<MovieView>,
    /// The previous selection if it is still visible, otherwise `None`.
    pub selection: Option<MovieId>,
}

pub fn project(
    catalog: &[MovieRecord],
    liked: &BTreeSet<MovieId>,
    settings: &Settings,
    selection: Option<MovieId>,
) -> Projection {
    let mut visible: Vec<MovieView> = catalog
        .iter()
        .map(|record| MovieView {
            record: record.clone(),
            liked: liked.contains(&record.id),
        })
        .filter(|view| settings.filter.matches(view))
        .collect();

    sort_views(&mut visible, settings.sort);

    let selection = selection.filter(|id| visible.iter().any(|v| v.id() == *id));

    Projection { visible, selection }
}

/// All branches use stable sorts, so equal keys keep catalog order.
fn sort_views(views: &mut [MovieView], sort: SortOption) {
    match sort {
        SortOption::Title => views.sort_by_cached_key(|v| v.record.title.to_lowercase()),
        // Plain string comparison; an absent date sorts as "" and lands last.
        SortOption::ReleaseDate => views.sort_by(|a, b| {
            let a = a.record.release_date.as_deref().unwrap_or("");
            let b = b.record.release_date.as_deref().unwrap_or("");
            b.cmp(a)
        }),
        SortOption::UserRating => {
            views.sort_by(|a, b| b.record.vote_average.total_cmp(&a.record.vote_average))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::mock::record;
    use crate::state::FilterOption;

    fn dated(id: MovieId, title: &str, date: Option<&str>) -> MovieRecord {
        MovieRecord {
            release_date: date.map(String::from),
            ..record(id, title)
        }
    }

    fn rated(id: MovieId, title: &str, rating: f64) -> MovieRecord {
        MovieRecord {
            vote_average: rating,
            ..record(id, title)
        }
    }

    fn settings(sort: SortOption, filter: FilterOption) -> Settings {
        Settings {
            sort,
            filter,
            ..Settings::default()
        }
    }

    fn ids(p: &Projection) -> Vec<MovieId> {
        p.visible.iter().map(|v| v.id()).collect()
    }

    fn liked(ids: &[MovieId]) -> BTreeSet<MovieId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn title_sort_ignores_case() {
        let catalog = vec![record(1, "beta"), record(2, "Alpha"), record(3, "Gamma")];
        let p = project(&catalog, &liked(&[]), &Settings::default(), None);
        assert_eq!(ids(&p), vec![2, 1, 3]);
    }

    #[test]
    fn title_sort_is_stable() {
        let catalog = vec![record(1, "Same"), record(2, "other"), record(3, "SAME")];
        let p = project(&catalog, &liked(&[]), &Settings::default(), None);
        assert_eq!(ids(&p), vec![2, 1, 3]);
    }

    #[test]
    fn release_date_descending_with_blank_last() {
        let catalog = vec![
            dated(1, "a", None),
            dated(2, "b", Some("2023-01-01")),
            dated(3, "c", Some("2024-06-30")),
            dated(4, "d", Some("")),
        ];
        let p = project(
            &catalog,
            &liked(&[]),
            &settings(SortOption::ReleaseDate, FilterOption::All),
            None,
        );
        assert_eq!(ids(&p), vec![3, 2, 1, 4]);
    }

    #[test]
    fn release_date_compares_as_strings() {
        // "2024-9-01" > "2024-10-01" lexicographically.
        let catalog = vec![
            dated(1, "a", Some("2024-10-01")),
            dated(2, "b", Some("2024-9-01")),
        ];
        let p = project(
            &catalog,
            &liked(&[]),
            &settings(SortOption::ReleaseDate, FilterOption::All),
            None,
        );
        assert_eq!(ids(&p), vec![2, 1]);
    }

    #[test]
    fn rating_descending_and_stable() {
        let catalog = vec![
            rated(1, "a", 7.0),
            rated(2, "b", 9.1),
            rated(3, "c", 7.0),
            rated(4, "d", 0.0),
        ];
        let p = project(
            &catalog,
            &liked(&[]),
            &settings(SortOption::UserRating, FilterOption::All),
            None,
        );
        assert_eq!(ids(&p), vec![2, 1, 3, 4]);
    }

    #[test]
    fn every_sort_is_stable_on_equal_keys() {
        let catalog: Vec<_> = (1..=6).map(|i| dated(i, "Tie", Some("2020-01-01"))).collect();
        for sort in [SortOption::Title, SortOption::ReleaseDate, SortOption::UserRating] {
            let p = project(&catalog, &liked(&[]), &settings(sort, FilterOption::All), None);
            assert_eq!(ids(&p), vec![1, 2, 3, 4, 5, 6], "sort {:?}", sort);
        }
    }

    #[test]
    fn overlay_marks_liked() {
        let catalog = vec![record(1, "a"), record(2, "b")];
        let p = project(&catalog, &liked(&[2, 99]), &Settings::default(), None);
        assert!(!p.visible[0].liked);
        assert!(p.visible[1].liked);
    }

    #[test]
    fn size_bounds_hold() {
        let catalog: Vec<_> = (1..=10).map(|i| record(i, &format!("m{}", i))).collect();
        let likes = liked(&[2, 4, 6]);

        let all = project(&catalog, &likes, &Settings::default(), None);
        assert_eq!(all.visible.len(), catalog.len());

        let only_liked = project(
            &catalog,
            &likes,
            &settings(SortOption::Title, FilterOption::Liked),
            None,
        );
        assert_eq!(only_liked.visible.len(), 3);
        assert!(only_liked.visible.iter().all(|v| v.liked));
    }

    #[test]
    fn selection_kept_when_visible() {
        let catalog = vec![record(7, "a"), record(8, "b")];
        let p = project(&catalog, &liked(&[]), &Settings::default(), Some(7));
        assert_eq!(p.selection, Some(7));
    }

    #[test]
    fn selection_cleared_when_filtered_out() {
        let catalog = vec![record(7, "a"), record(8, "b")];
        let p = project(
            &catalog,
            &liked(&[8]),
            &settings(SortOption::Title, FilterOption::Liked),
            Some(7),
        );
        assert_eq!(p.selection, None);
    }

    #[test]
    fn selection_cleared_when_missing_from_catalog() {
        let catalog = vec![record(1, "a")];
        let p = project(&catalog, &liked(&[]), &Settings::default(), Some(7));
        assert_eq!(p.selection, None);
    }

    #[test]
    fn projection_is_deterministic() {
        let catalog = vec![
            rated(3, "c", 5.0),
            rated(1, "a", 5.0),
            rated(2, "b", 6.0),
        ];
        let s = settings(SortOption::UserRating, FilterOption::All);
        let first = project(&catalog, &liked(&[1]), &s, Some(1));
        let second = project(&catalog, &liked(&[1]), &s, Some(1));
        assert_eq!(first, second);
    }

    #[test]
    fn empty_catalog_projects_empty() {
        let p = project(&[], &liked(&[1]), &Settings::default(), Some(1));
        assert!(p.visible.is_empty());
        assert_eq!(p.selection, None);
    }
}
