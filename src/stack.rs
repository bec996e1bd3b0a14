//! Stack overflow guard zones
//!
//! Resolves the guard page counts of a thread stack against the table and
//! lays the zones out at the low end of the stack:
//!
//! ```text
//!   stack_end                                                   stack_base
//!   | red | yellow | reserved? | usable ...................................|
//! ```
//!
//! The reserved zone only exists when the table supports a reserved stack
//! area and the resolved page count is non-zero. Code that walks the zones
//! must go through [`StackZones::reserved`], which is `None` otherwise.

use core::ops::Range;

use crate::error::StackError;
use crate::types::{StackPages, TraitTable};

/// How far above its default each page count may be configured
const ZONE_HEADROOM: usize = 10;
const SHADOW_HEADROOM: usize = 30;

/// Requested page counts; `None` takes the platform default
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackRequest {
    pub yellow: Option<usize>,
    pub red: Option<usize>,
    pub reserved: Option<usize>,
    pub shadow: Option<usize>,
}

/// Resolved guard page counts for one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackGuard {
    pages: StackPages,
}

fn in_range(zone: &'static str, value: usize, min: usize, max: usize) -> Result<usize, StackError> {
    if value < min || value > max {
        return Err(StackError::PagesOutOfRange {
            zone,
            value,
            min,
            max,
        });
    }
    Ok(value)
}

impl StackGuard {
    /// Apply `request` on top of the table defaults.
    ///
    /// A non-zero reserved page request on a table without reserved stack
    /// area support is reset to zero with a warning instead of failing.
    pub fn resolve(table: &TraitTable, request: &StackRequest) -> Result<Self, StackError> {
        let def = &table.defaults.stack_pages;
        let min = &table.defaults.min_stack_pages;

        let mut reserved = request.reserved.unwrap_or(def.reserved);
        if !table.reserved_stack_area && reserved != 0 {
            log::warn!(
                "{}: reserved stack area not supported, ignoring {} reserved pages",
                table.name,
                reserved
            );
            reserved = 0;
        }

        let pages = StackPages {
            yellow: in_range(
                "yellow",
                request.yellow.unwrap_or(def.yellow),
                min.yellow,
                def.yellow + ZONE_HEADROOM,
            )?,
            red: in_range(
                "red",
                request.red.unwrap_or(def.red),
                min.red,
                def.red + ZONE_HEADROOM,
            )?,
            reserved: in_range("reserved", reserved, min.reserved, def.reserved + ZONE_HEADROOM)?,
            shadow: in_range(
                "shadow",
                request.shadow.unwrap_or(def.shadow),
                min.shadow,
                def.shadow + SHADOW_HEADROOM,
            )?,
        };

        log::debug!("{}: stack guard pages {}", table.name, pages);
        Ok(StackGuard { pages })
    }

    pub fn pages(&self) -> StackPages {
        self.pages
    }

    pub fn has_reserved_area(&self) -> bool {
        self.pages.reserved != 0
    }

    /// Bytes of red, yellow and reserved zones together, `None` on overflow
    pub fn guard_bytes(&self, page_size: u64) -> Option<u64> {
        ((self.pages.red + self.pages.yellow + self.pages.reserved) as u64).checked_mul(page_size)
    }

    pub fn shadow_bytes(&self, page_size: u64) -> Option<u64> {
        (self.pages.shadow as u64).checked_mul(page_size)
    }

    /// Lay the zones out for a stack growing down from `stack_base`
    pub fn zones(
        &self,
        stack_base: u64,
        stack_size: u64,
        page_size: u64,
    ) -> Result<StackZones, StackError> {
        if !page_size.is_power_of_two() {
            return Err(StackError::PageSize(page_size));
        }
        if stack_base % page_size != 0 {
            return Err(StackError::UnalignedBase(stack_base));
        }
        let sizes = self
            .guard_bytes(page_size)
            .zip(self.shadow_bytes(page_size))
            .and_then(|(guard, shadow)| Some((guard, guard.checked_add(shadow)?)));
        let Some((guard, needed)) = sizes else {
            return Err(StackError::PageSize(page_size));
        };
        if stack_size < needed || stack_size > stack_base {
            return Err(StackError::StackTooSmall {
                size: stack_size,
                guard: needed,
            });
        }

        let end = stack_base - stack_size;
        let red_top = end + self.pages.red as u64 * page_size;
        let yellow_top = red_top + self.pages.yellow as u64 * page_size;
        let reserved_top = end + guard;

        Ok(StackZones {
            base: stack_base,
            end,
            red: end..red_top,
            yellow: red_top..yellow_top,
            reserved: if self.has_reserved_area() {
                Some(yellow_top..reserved_top)
            } else {
                None
            },
            shadow_safe_limit: end + needed,
        })
    }
}

/// Which part of a stack an address falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Red,
    Yellow,
    Reserved,
    Usable,
    Outside,
}

/// Guard zone address ranges of one thread stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackZones {
    base: u64,
    end: u64,
    red: Range<u64>,
    yellow: Range<u64>,
    reserved: Option<Range<u64>>,
    shadow_safe_limit: u64,
}

impl StackZones {
    pub fn red(&self) -> Range<u64> {
        self.red.clone()
    }

    pub fn yellow(&self) -> Range<u64> {
        self.yellow.clone()
    }

    /// The reserved zone, absent when the stack has none
    pub fn reserved(&self) -> Option<Range<u64>> {
        self.reserved.clone()
    }

    /// Addresses usable by ordinary frames
    pub fn usable(&self) -> Range<u64> {
        let low = match &self.reserved {
            Some(r) => r.end,
            None => self.yellow.end,
        };
        low..self.base
    }

    /// Lowest stack pointer at which a call into native code is safe
    /// without banging the shadow pages
    pub fn shadow_safe_limit(&self) -> u64 {
        self.shadow_safe_limit
    }

    pub fn classify(&self, addr: u64) -> Zone {
        if addr < self.end || addr >= self.base {
            Zone::Outside
        } else if self.red.contains(&addr) {
            Zone::Red
        } else if self.yellow.contains(&addr) {
            Zone::Yellow
        } else if self.reserved.as_ref().is_some_and(|r| r.contains(&addr)) {
            Zone::Reserved
        } else {
            Zone::Usable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{mips64::Mips64, table_of};

    const PAGE: u64 = 4096;
    const BASE: u64 = 0x7fff_0000_0000;
    const SIZE: u64 = 1024 * 1024;

    fn no_reserved_table() -> TraitTable {
        let mut t = table_of::<Mips64>();
        t.reserved_stack_area = false;
        t.defaults.stack_pages.reserved = 0;
        t
    }

    #[test]
    fn test_defaults() {
        let guard = StackGuard::resolve(&table_of::<Mips64>(), &StackRequest::default()).unwrap();
        assert_eq!(
            guard.pages(),
            StackPages {
                yellow: 2,
                red: 1,
                reserved: 1,
                shadow: 20
            }
        );
        assert!(guard.has_reserved_area());
        assert_eq!(guard.guard_bytes(PAGE), Some(4 * PAGE));
        assert_eq!(guard.shadow_bytes(PAGE), Some(20 * PAGE));
    }

    #[test]
    fn test_zone_layout() {
        let guard = StackGuard::resolve(&table_of::<Mips64>(), &StackRequest::default()).unwrap();
        let zones = guard.zones(BASE, SIZE, PAGE).unwrap();
        let end = BASE - SIZE;
        assert_eq!(zones.red(), end..end + PAGE);
        assert_eq!(zones.yellow(), end + PAGE..end + 3 * PAGE);
        assert_eq!(zones.reserved(), Some(end + 3 * PAGE..end + 4 * PAGE));
        assert_eq!(zones.usable(), end + 4 * PAGE..BASE);
        assert_eq!(zones.shadow_safe_limit(), end + 24 * PAGE);

        assert_eq!(zones.classify(end), Zone::Red);
        assert_eq!(zones.classify(end + 2 * PAGE), Zone::Yellow);
        assert_eq!(zones.classify(end + 3 * PAGE + 8), Zone::Reserved);
        assert_eq!(zones.classify(BASE - 8), Zone::Usable);
        assert_eq!(zones.classify(BASE), Zone::Outside);
        assert_eq!(zones.classify(end - 1), Zone::Outside);
    }

    #[test]
    fn test_no_reserved_area() {
        let t = no_reserved_table();
        let request = StackRequest {
            reserved: Some(3),
            ..StackRequest::default()
        };
        let guard = StackGuard::resolve(&t, &request).unwrap();
        assert_eq!(guard.pages().reserved, 0);
        assert!(!guard.has_reserved_area());

        let zones = guard.zones(BASE, SIZE, PAGE).unwrap();
        assert_eq!(zones.reserved(), None);
        let end = BASE - SIZE;
        assert_eq!(zones.usable(), end + 3 * PAGE..BASE);
        assert_eq!(zones.classify(end + 3 * PAGE), Zone::Usable);
    }

    #[test]
    fn test_reserved_zero_request_drops_zone() {
        let request = StackRequest {
            reserved: Some(0),
            ..StackRequest::default()
        };
        let guard = StackGuard::resolve(&table_of::<Mips64>(), &request).unwrap();
        let zones = guard.zones(BASE, SIZE, PAGE).unwrap();
        assert_eq!(zones.reserved(), None);
    }

    #[test]
    fn test_out_of_range() {
        let t = table_of::<Mips64>();
        let request = StackRequest {
            yellow: Some(1),
            ..StackRequest::default()
        };
        assert_eq!(
            StackGuard::resolve(&t, &request),
            Err(StackError::PagesOutOfRange {
                zone: "yellow",
                value: 1,
                min: 2,
                max: 12
            })
        );

        let request = StackRequest {
            shadow: Some(51),
            ..StackRequest::default()
        };
        assert!(StackGuard::resolve(&t, &request).is_err());

        let request = StackRequest {
            shadow: Some(50),
            ..StackRequest::default()
        };
        assert!(StackGuard::resolve(&t, &request).is_ok());
    }

    #[test]
    fn test_huge_page_size_is_an_error() {
        let guard = StackGuard::resolve(&table_of::<Mips64>(), &StackRequest::default()).unwrap();
        assert_eq!(guard.guard_bytes(1 << 62), None);
        assert_eq!(guard.shadow_bytes(1 << 62), None);
        assert_eq!(guard.zones(0, 0, 1 << 62), Err(StackError::PageSize(1 << 62)));
        assert_eq!(
            guard.zones(1 << 63, 1 << 62, 1 << 61),
            Err(StackError::PageSize(1 << 61))
        );
    }

    #[test]
    fn test_bad_geometry() {
        let guard = StackGuard::resolve(&table_of::<Mips64>(), &StackRequest::default()).unwrap();
        assert_eq!(guard.zones(BASE, SIZE, 3000), Err(StackError::PageSize(3000)));
        assert_eq!(
            guard.zones(BASE + 8, SIZE, PAGE),
            Err(StackError::UnalignedBase(BASE + 8))
        );
        assert_eq!(
            guard.zones(BASE, 8 * PAGE, PAGE),
            Err(StackError::StackTooSmall {
                size: 8 * PAGE,
                guard: 24 * PAGE
            })
        );
    }
}
