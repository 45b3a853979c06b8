/// Chooses the shard hash key a batch is routed with.
///
/// [`initialize`](Self::initialize) is called once when the sink opens,
/// with this instance's index and the total number of parallel instances,
/// so routing can be made deterministic per instance.
pub trait LogPartitioner<T>: Send + Sync {
    fn initialize(&mut self, index: usize, count: usize);

    /// Shard hash key for `element`, or `None` to let the service pick.
    fn hash_key(&self, element: &T) -> Option<String>;
}

/// Routes everything written by one instance to the start of that
/// instance's equal slice of the 128-bit shard hash space.
#[derive(Debug, Default, Clone)]
pub struct SubtaskHashPartitioner {
    key: Option<String>,
}

impl SubtaskHashPartitioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower bound of slice `index` out of `count`, as 32 hex digits.
    pub fn range_start(index: usize, count: usize) -> String {
        let count = count.max(1) as u128;
        let index = (index as u128).min(count - 1);
        let width = u128::MAX / count;
        format!("{:032x}", width * index)
    }
}

impl<T> LogPartitioner<T> for SubtaskHashPartitioner {
    fn initialize(&mut self, index: usize, count: usize) {
        self.key = Some(Self::range_start(index, count));
    }

    fn hash_key(&self, _element: &T) -> Option<String> {
        self.key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_split_the_hash_space_evenly() {
        assert_eq!(SubtaskHashPartitioner::range_start(0, 4), "0".repeat(32));
        assert_eq!(
            SubtaskHashPartitioner::range_start(2, 4),
            "7ffffffffffffffffffffffffffffffe"
        );
        assert_eq!(SubtaskHashPartitioner::range_start(0, 0), "0".repeat(32));
    }

    #[test]
    fn key_is_fixed_after_initialization() {
        let mut partitioner = SubtaskHashPartitioner::new();
        assert_eq!(LogPartitioner::<u32>::hash_key(&partitioner, &1), None);

        LogPartitioner::<u32>::initialize(&mut partitioner, 1, 2);
        let key = LogPartitioner::<u32>::hash_key(&partitioner, &1);
        assert_eq!(key, LogPartitioner::<u32>::hash_key(&partitioner, &99));
        assert_eq!(key.unwrap().len(), 32);
    }
}
