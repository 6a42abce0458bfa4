//! Phase-grouped dependency ordering
//!
//! Instances are grouped by phase in temporal order. Within a group,
//! repeated passes place every instance whose factors are already placed
//! (in this group or an earlier phase) until a pass places nothing. Anything
//! left over is part of a cycle or depends on a later phase.

use crate::schema::{ConfigError, Phase, PropertyInstance};

/// Order instance indices so every factor precedes its dependents
///
/// `deps[i]` lists the indices instance `i` depends on. Returns the
/// permutation of `0..instances.len()` in computation order.
pub(crate) fn sort_by_dependencies(
    instances: &[PropertyInstance],
    deps: &[Vec<usize>],
) -> Result<Vec<usize>, ConfigError> {
    let mut order = Vec::with_capacity(instances.len());
    let mut placed = vec![false; instances.len()];

    for phase in Phase::ALL {
        let mut pending: Vec<usize> = (0..instances.len())
            .filter(|&i| instances[i].phase == phase)
            .collect();

        while !pending.is_empty() {
            let mut progressed = false;
            let mut remaining = Vec::with_capacity(pending.len());

            for idx in pending {
                if deps[idx].iter().all(|&d| placed[d]) {
                    placed[idx] = true;
                    order.push(idx);
                    progressed = true;
                } else {
                    remaining.push(idx);
                }
            }

            if !progressed {
                return Err(ConfigError::CircularDependency {
                    phase,
                    unplaced: remaining
                        .iter()
                        .map(|&i| instances[i].qualified_name())
                        .collect(),
                });
            }
            pending = remaining;
        }
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Curve, DataType, Entity, ValueKind};

    fn range(name: &str, phase: Phase) -> PropertyInstance {
        PropertyInstance {
            name: name.to_string(),
            inst_name: name.to_string(),
            data_type: DataType::Number,
            entity: Entity::Tasks,
            phase,
            kind: ValueKind::Range {
                min: 0.0,
                max: 1.0,
                curve: Curve::Uniform,
                skew: 0.0,
            },
            value_cnt: 1,
            is_attribute: false,
            influences: Vec::new(),
        }
    }

    #[test]
    fn test_phases_in_temporal_order() {
        let instances = vec![
            range("c", Phase::Complete),
            range("a", Phase::Arrive),
            range("d", Phase::Deploy),
        ];
        let order = sort_by_dependencies(&instances, &[vec![], vec![], vec![]]).unwrap();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_chain_within_phase() {
        let instances = vec![
            range("x", Phase::Assign),
            range("y", Phase::Assign),
            range("z", Phase::Assign),
        ];
        // x <- y <- z
        let deps = vec![vec![1], vec![2], vec![]];
        let order = sort_by_dependencies(&instances, &deps).unwrap();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_later_phase_dependency_is_unplaceable() {
        let instances = vec![range("early", Phase::Arrive), range("late", Phase::Complete)];
        let deps = vec![vec![1], vec![]];
        let err = sort_by_dependencies(&instances, &deps).unwrap_err();
        assert_eq!(
            err,
            ConfigError::CircularDependency {
                phase: Phase::Arrive,
                unplaced: vec!["early.early".to_string()],
            }
        );
    }
}
