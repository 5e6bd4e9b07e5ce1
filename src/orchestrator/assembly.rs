use crate::error::{RenderError, RenderResult};

/// Reorders items that complete out of order into ordinal order.
///
/// Items land in a dense slot array indexed by ordinal. A single pointer tracks the next ordinal
/// to release, so release order never depends on completion order.
#[derive(Debug)]
pub struct OrderedAssembler<T> {
    first: u32,
    slots: Vec<Option<T>>,
    next: usize,
}

impl<T> OrderedAssembler<T> {
    /// Accepts ordinals `first..=last`.
    pub fn new(first: u32, last: u32) -> Self {
        let len = last.saturating_sub(first).saturating_add(1) as usize;
        Self {
            first,
            slots: (0..len).map(|_| None).collect(),
            next: 0,
        }
    }

    pub fn insert(&mut self, ordinal: u32, item: T) -> RenderResult<()> {
        let idx = ordinal
            .checked_sub(self.first)
            .map(|i| i as usize)
            .filter(|&i| i < self.slots.len())
            .ok_or_else(|| RenderError::render(format!("frame {ordinal} is out of range")))?;
        if idx < self.next || self.slots[idx].is_some() {
            return Err(RenderError::render(format!("frame {ordinal} delivered twice")));
        }
        self.slots[idx] = Some(item);
        Ok(())
    }

    /// Take every item that is now contiguous with those already released.
    pub fn drain_ready(&mut self) -> Vec<(u32, T)> {
        let mut out = Vec::new();
        while let Some(item) = self.slots.get_mut(self.next).and_then(Option::take) {
            out.push((self.first + self.next as u32, item));
            self.next += 1;
        }
        out
    }

    /// The ordinal the next released item will carry.
    pub fn next_expected(&self) -> u32 {
        self.first + self.next as u32
    }

    pub fn is_complete(&self) -> bool {
        self.next == self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release_order(first: u32, last: u32, arrival: &[u32]) -> Vec<u32> {
        let mut asm = OrderedAssembler::new(first, last);
        let mut out = Vec::new();
        for &o in arrival {
            asm.insert(o, o * 10).unwrap();
            out.extend(asm.drain_ready().into_iter().map(|(ord, v)| {
                assert_eq!(v, ord * 10);
                ord
            }));
        }
        assert!(asm.is_complete());
        out
    }

    #[test]
    fn releases_in_ordinal_order_for_any_arrival() {
        let expected: Vec<u32> = (2..=9).collect();
        for arrival in [
            vec![2, 3, 4, 5, 6, 7, 8, 9],
            vec![9, 8, 7, 6, 5, 4, 3, 2],
            vec![5, 2, 9, 3, 8, 4, 7, 6],
            vec![3, 4, 5, 6, 7, 8, 9, 2],
        ] {
            assert_eq!(release_order(2, 9, &arrival), expected);
        }
    }

    #[test]
    fn holds_items_until_the_gap_fills() {
        let mut asm = OrderedAssembler::new(1, 3);
        asm.insert(3, "c").unwrap();
        asm.insert(2, "b").unwrap();
        assert!(asm.drain_ready().is_empty());
        assert_eq!(asm.next_expected(), 1);
        asm.insert(1, "a").unwrap();
        assert_eq!(asm.drain_ready(), vec![(1, "a"), (2, "b"), (3, "c")]);
    }

    #[test]
    fn rejects_duplicates_and_strays() {
        let mut asm = OrderedAssembler::new(2, 4);
        asm.insert(2, ()).unwrap();
        assert!(asm.insert(2, ()).is_err());
        asm.drain_ready();
        assert!(asm.insert(2, ()).is_err());
        assert!(asm.insert(1, ()).is_err());
        assert!(asm.insert(5, ()).is_err());
    }
}
