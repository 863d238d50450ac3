use std::collections::HashSet;

use log::trace;
use rand::Rng;

use super::error::GraphError;
use super::graph::NodeId;

pub const ID_LENGTH: usize = 10;
pub const MAX_ID_ATTEMPTS: usize = 64;

/// Every id handed out (or claimed explicitly) during this session.
///
/// The registry only grows: clearing the graph keeps it, so an id is never
/// issued twice while the process lives.
#[derive(Debug, Default, Clone)]
pub struct IdRegistry {
    issued: HashSet<NodeId>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self) -> Result<NodeId, GraphError> {
        self.generate_with(&mut rand::thread_rng())
    }

    // Rejection sampler: a colliding id is thrown away whole and redrawn.
    pub fn generate_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<NodeId, GraphError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = random_id(rng);
            if self.issued.insert(id.clone()) {
                return Ok(id);
            }
            trace!("id collision on {}, retrying", id);
        }
        Err(GraphError::IdSpaceExhausted { attempts: MAX_ID_ATTEMPTS })
    }

    // Record an externally supplied id (e.g. from a loaded document).
    pub fn register(&mut self, id: &str) {
        if !self.issued.contains(id) {
            self.issued.insert(id.to_string());
        }
    }

    pub fn is_issued(&self, id: &str) -> bool {
        self.issued.contains(id)
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}

fn random_id<R: Rng + ?Sized>(rng: &mut R) -> NodeId {
    (0..ID_LENGTH)
        .map(|_| {
            if rng.gen_bool(0.5) {
                char::from(b'0' + rng.gen_range(0..10u8))
            } else {
                char::from(b'A' + rng.gen_range(0..26u8))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::rngs::mock::StepRng;

    #[test]
    fn generated_ids_have_expected_shape() {
        let mut reg = IdRegistry::new();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let id = reg.generate_with(&mut rng).unwrap();
            assert_eq!(id.len(), ID_LENGTH);
            assert!(id.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
        assert_eq!(reg.len(), 200);
    }

    #[test]
    fn ids_mix_digits_and_letters() {
        let mut reg = IdRegistry::new();
        let mut rng = StdRng::seed_from_u64(42);
        let joined: String = (0..50).map(|_| reg.generate_with(&mut rng).unwrap()).collect();
        assert!(joined.chars().any(|c| c.is_ascii_digit()));
        assert!(joined.chars().any(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn constant_source_exhausts_after_first_id() {
        let mut reg = IdRegistry::new();
        // A stuck random source yields the same id every draw.
        let mut rng = StepRng::new(0, 0);
        let first = reg.generate_with(&mut rng).unwrap();
        assert!(reg.is_issued(&first));
        let err = reg.generate_with(&mut rng).unwrap_err();
        assert_eq!(err, GraphError::IdSpaceExhausted { attempts: MAX_ID_ATTEMPTS });
    }

    #[test]
    fn registered_ids_are_never_generated() {
        let mut reg = IdRegistry::new();
        let mut rng = StepRng::new(0, 0);
        let taken = random_id(&mut StepRng::new(0, 0));
        reg.register(&taken);
        assert!(reg.generate_with(&mut rng).is_err());
    }
}
