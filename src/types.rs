/**
 * ItemSim
 * Copyright (C) 2026 ItemSim contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

/// Marks similarity matrix cells that were never computed (the diagonal and
/// anything the sweep did not reach). Valid similarities lie in [-1, 1], so
/// the minimum representable value cannot collide with a computed score.
pub const UNSET_SIMILARITY: f32 = ::std::f32::MIN;

/// One entry of an item's rating vector, keyed by internal user index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rating {
    pub user: u32,
    pub rating: f32,
}

/// Per-item ratings, sorted ascending by internal user index, at most one
/// entry per user.
pub type RatingVector = Vec<Rating>;

/// One cell of the upper triangle of the similarity matrix, `item1 < item2`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ItemPair {
    pub item1: u32,
    pub item2: u32,
}
