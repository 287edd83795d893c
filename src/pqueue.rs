//! Binary max-heap whose entries keep stable handles, so a priority can be
//! raised or lowered in O(log n) after construction.

/// One heap entry: its current priority and its slot in the heap array.
struct Node<T> {
    pri: T,
    pos: usize,
}

/// Priority queue over entries `0..n` that allows changing the priority of
/// its entries after creation.
///
/// Two arrays are kept consistent under every shift: `nodes[handle]`
/// stores the priority and the heap slot of a handle, `idx[pos]` maps a
/// heap slot (1-based) back to the handle stored there.
pub struct PQueue<T> {
    nodes: Vec<Node<T>>,
    idx: Vec<usize>,
}

impl<T: Ord + Clone> PQueue<T> {
    /// Constructs a queue of size `n` with all priorities at their default.
    pub fn new(n: usize) -> Self
    where
        T: Default,
    {
        Self::from_priorities((0..n).map(|_| T::default()).collect())
    }

    /// Constructs a queue with priorities taken from `pri`.
    pub fn from_priorities(pri: Vec<T>) -> Self {
        assert!(!pri.is_empty(), "empty priority queue");
        let n = pri.len();
        let nodes = pri
            .into_iter()
            .enumerate()
            .map(|(i, pri)| Node { pri, pos: i + 1 })
            .collect();
        let mut idx = vec![0; n + 1];
        for (i, slot) in idx.iter_mut().enumerate().skip(1) {
            *slot = i - 1;
        }
        let mut queue = PQueue { nodes, idx };
        queue.heapify();
        queue
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn sift_up(&mut self, mut i: usize) {
        let moving = self.idx[i];
        let moving_pri = self.nodes[moving].pri.clone();
        while i > 1 {
            let parent = i >> 1;
            if self.nodes[self.idx[parent]].pri >= moving_pri {
                break;
            }
            self.idx[i] = self.idx[parent];
            self.nodes[self.idx[i]].pos = i;
            i = parent;
        }
        self.idx[i] = moving;
        self.nodes[moving].pos = i;
    }

    /// The larger child slot of `i`, or 0 if `i` is a leaf.
    fn max_child(&self, i: usize) -> usize {
        let mut child = i << 1;
        if child >= self.idx.len() {
            return 0;
        }
        if child + 1 < self.idx.len()
            && self.nodes[self.idx[child]].pri < self.nodes[self.idx[child + 1]].pri
        {
            child += 1;
        }
        child
    }

    fn sift_down(&mut self, mut i: usize) {
        let moving = self.idx[i];
        let moving_pri = self.nodes[moving].pri.clone();
        loop {
            let child = self.max_child(i);
            if child == 0 || self.nodes[self.idx[child]].pri <= moving_pri {
                break;
            }
            self.idx[i] = self.idx[child];
            self.nodes[self.idx[i]].pos = i;
            i = child;
        }
        self.idx[i] = moving;
        self.nodes[moving].pos = i;
    }

    /// Floyd construction: sift down every inner slot, bottom-up.
    fn heapify(&mut self) {
        for i in (1..=(self.idx.len() >> 1)).rev() {
            self.sift_down(i);
        }
    }

    /// Sets the priority of `handle` to `new_pri` and restores the heap
    /// property with a single sift.
    pub fn set_priority(&mut self, new_pri: T, handle: usize) {
        let raise = self.nodes[handle].pri < new_pri;
        self.nodes[handle].pri = new_pri;
        let pos = self.nodes[handle].pos;
        if raise {
            self.sift_up(pos);
        } else {
            self.sift_down(pos);
        }
    }

    /// Current priority of `handle`.
    pub fn priority(&self, handle: usize) -> &T {
        &self.nodes[handle].pri
    }

    /// Handle of the entry with the greatest priority.
    pub fn top(&self) -> usize {
        self.idx[1]
    }

    /// Greatest priority in the queue.
    pub fn top_priority(&self) -> &T {
        &self.nodes[self.idx[1]].pri
    }
}
