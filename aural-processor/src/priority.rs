/// Dequeue priority for a `ProcessingTask`. Ordered so that `Urgent`
/// sorts greatest under `Ord`, matching a max-heap pop order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}
