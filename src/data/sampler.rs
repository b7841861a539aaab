use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::DatasetError;

use super::index::ClassRoster;

/// Support and query filename groups for one episode.
///
/// `support` holds `n_way` groups of `k_shot` filenames, `query` holds
/// `n_way` groups of `k_query` filenames. The two group orders are shuffled
/// independently, so `support[i]` and `query[i]` generally belong to
/// different classes; materialization recovers the correspondence through
/// absolute labels, never through group position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeGroups {
    pub support: Vec<Vec<String>>,
    pub query: Vec<Vec<String>>,
}

/// Pre-generated filename selections for a fixed number of episodes.
///
/// Generated eagerly at dataset construction and immutable afterwards;
/// repeated epochs see the same episodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodePlan {
    episodes: Vec<EpisodeGroups>,
}

impl EpisodePlan {
    /// Sample `batch_size` episodes from the roster.
    ///
    /// Per episode: `n_way` classes without replacement (order shuffled),
    /// then per class `k_shot + k_query` filenames without replacement,
    /// split disjointly into the support and query groups.
    pub fn generate(
        roster: &ClassRoster,
        batch_size: usize,
        n_way: usize,
        k_shot: usize,
        k_query: usize,
        rng: &mut StdRng,
    ) -> Result<Self, DatasetError> {
        if roster.class_count() < n_way {
            return Err(DatasetError::InsufficientClasses {
                available: roster.class_count(),
                requested: n_way,
            });
        }

        // every class is eligible for selection, so an undersized class
        // anywhere fails the whole plan up front, before any image I/O
        let needed = k_shot + k_query;
        for cls in 0..roster.class_count() {
            let available = roster.filenames_for(cls).len();
            if available < needed {
                return Err(DatasetError::InsufficientSamples {
                    label: roster.label_for_class(cls).to_owned(),
                    available,
                    needed,
                });
            }
        }

        let class_ids: Vec<usize> = (0..roster.class_count()).collect();
        let mut episodes = Vec::with_capacity(batch_size);

        for _ in 0..batch_size {
            let mut picked: Vec<usize> = class_ids.choose_multiple(rng, n_way).copied().collect();
            picked.shuffle(rng);

            let mut support = Vec::with_capacity(n_way);
            let mut query = Vec::with_capacity(n_way);
            for &cls in &picked {
                let files = roster.filenames_for(cls);
                let mut chosen = rand::seq::index::sample(rng, files.len(), needed).into_vec();
                chosen.shuffle(rng);
                support.push(chosen[..k_shot].iter().map(|&i| files[i].clone()).collect());
                query.push(chosen[k_shot..].iter().map(|&i| files[i].clone()).collect());
            }

            // the two orders are deliberately decoupled
            support.shuffle(rng);
            query.shuffle(rng);

            episodes.push(EpisodeGroups { support, query });
        }

        Ok(Self { episodes })
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    pub fn episode(&self, index: usize) -> Option<&EpisodeGroups> {
        self.episodes.get(index)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;

    use super::*;
    use crate::data::index::LabelIndex;

    fn roster(classes: usize, files_per_class: usize) -> ClassRoster {
        let mut index = LabelIndex::default();
        for c in 0..classes {
            let label = format!("n{c:08}");
            for f in 0..files_per_class {
                index.push(label.clone(), format!("{label}{f:08}.jpg"));
            }
        }
        ClassRoster::new(index, 0)
    }

    fn label_of(filename: &str) -> &str {
        &filename[..9]
    }

    #[test]
    fn groups_have_requested_shape() {
        let roster = roster(10, 8);
        let mut rng = StdRng::seed_from_u64(7);
        let plan = EpisodePlan::generate(&roster, 20, 5, 2, 3, &mut rng).unwrap();

        assert_eq!(plan.len(), 20);
        for e in 0..plan.len() {
            let groups = plan.episode(e).unwrap();
            assert_eq!(groups.support.len(), 5);
            assert_eq!(groups.query.len(), 5);
            assert!(groups.support.iter().all(|g| g.len() == 2));
            assert!(groups.query.iter().all(|g| g.len() == 3));
        }
    }

    #[test]
    fn support_and_query_are_disjoint_per_class() {
        let roster = roster(6, 10);
        let mut rng = StdRng::seed_from_u64(11);
        let plan = EpisodePlan::generate(&roster, 50, 4, 3, 4, &mut rng).unwrap();

        for e in 0..plan.len() {
            let groups = plan.episode(e).unwrap();

            // regroup both sides by class label, since group order is shuffled
            for support_group in &groups.support {
                let label = label_of(&support_group[0]);
                assert!(support_group.iter().all(|f| label_of(f) == label));

                let query_group = groups
                    .query
                    .iter()
                    .find(|g| label_of(&g[0]) == label)
                    .expect("every support class has a query group");
                assert!(query_group.iter().all(|f| label_of(f) == label));

                let support_set: HashSet<_> = support_group.iter().collect();
                let query_set: HashSet<_> = query_group.iter().collect();
                assert_eq!(support_set.len(), support_group.len());
                assert_eq!(query_set.len(), query_group.len());
                assert!(support_set.is_disjoint(&query_set));
            }
        }
    }

    #[test]
    fn classes_are_distinct_within_an_episode() {
        let roster = roster(8, 6);
        let mut rng = StdRng::seed_from_u64(3);
        let plan = EpisodePlan::generate(&roster, 30, 5, 2, 2, &mut rng).unwrap();

        for e in 0..plan.len() {
            let groups = plan.episode(e).unwrap();
            let labels: HashSet<_> = groups.support.iter().map(|g| label_of(&g[0])).collect();
            assert_eq!(labels.len(), 5);
            let query_labels: HashSet<_> = groups.query.iter().map(|g| label_of(&g[0])).collect();
            assert_eq!(labels, query_labels);
        }
    }

    #[test]
    fn exact_sample_count_uses_every_file_once() {
        // k_shot + k_query equals the class size, so selection must use
        // every file exactly once without failing
        let roster = roster(4, 5);
        let mut rng = StdRng::seed_from_u64(5);
        let plan = EpisodePlan::generate(&roster, 10, 3, 2, 3, &mut rng).unwrap();

        for e in 0..plan.len() {
            let groups = plan.episode(e).unwrap();
            for support_group in &groups.support {
                let label = label_of(&support_group[0]);
                let query_group = groups
                    .query
                    .iter()
                    .find(|g| label_of(&g[0]) == label)
                    .unwrap();
                let used: HashSet<_> = support_group.iter().chain(query_group.iter()).collect();
                assert_eq!(used.len(), 5);
            }
        }
    }

    #[test]
    fn undersized_class_fails_generation() {
        let roster = roster(4, 3);
        let mut rng = StdRng::seed_from_u64(1);
        let err = EpisodePlan::generate(&roster, 10, 4, 2, 2, &mut rng).unwrap_err();
        match err {
            DatasetError::InsufficientSamples {
                available, needed, ..
            } => {
                assert_eq!(available, 3);
                assert_eq!(needed, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn too_few_classes_fails_generation() {
        let roster = roster(3, 10);
        let mut rng = StdRng::seed_from_u64(1);
        let err = EpisodePlan::generate(&roster, 1, 5, 1, 1, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::InsufficientClasses {
                available: 3,
                requested: 5
            }
        ));
    }

    #[test]
    fn same_seed_reproduces_the_plan() {
        let roster = roster(10, 8);
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        let plan_a = EpisodePlan::generate(&roster, 15, 5, 1, 2, &mut a).unwrap();
        let plan_b = EpisodePlan::generate(&roster, 15, 5, 1, 2, &mut b).unwrap();
        assert_eq!(plan_a, plan_b);
    }
}
