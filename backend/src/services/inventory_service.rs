use upgrade_shared::shared_upgrade_game::{
    compute_chance, InventorySnapshot, Item, PreviewRequest, Side,
};
use upgrade_shared::validation::dedup_ids;

/// The two inventories. Every item lives in exactly one of them; settlement
/// only ever moves items across, so the total never changes after load.
#[derive(Debug, Clone, Default)]
pub struct InventoryStore {
    user: Vec<Item>,
    site: Vec<Item>,
}

impl InventoryStore {
    pub fn new(user: Vec<Item>, site: Vec<Item>) -> Self {
        Self { user, site }
    }

    pub fn items(&self, side: Side) -> &[Item] {
        match side {
            Side::User => &self.user,
            Side::Site => &self.site,
        }
    }

    fn items_mut(&mut self, side: Side) -> &mut Vec<Item> {
        match side {
            Side::User => &mut self.user,
            Side::Site => &mut self.site,
        }
    }

    pub fn total_items(&self) -> usize {
        self.user.len() + self.site.len()
    }

    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            site_inventory: self.site.clone(),
            user_inventory: self.user.clone(),
        }
    }

    fn find(&self, side: Side, id: &str) -> Option<&Item> {
        self.items(side).iter().find(|item| item.id == id)
    }

    /// Resolves every id against `side`, or `None` if any of them is gone.
    pub fn resolve(&self, side: Side, ids: &[String]) -> Option<Vec<Item>> {
        ids.iter()
            .map(|id| self.find(side, id).cloned())
            .collect()
    }

    /// Chance for the ids that still resolve; unknown ids are skipped and a
    /// repeated id counts once, as it does when settling.
    pub fn preview(&self, request: &PreviewRequest) -> f64 {
        let user_ids = dedup_ids(&request.user_item_ids);
        let site_ids = dedup_ids(&request.site_item_ids);
        let user_items = user_ids.iter().filter_map(|id| self.find(Side::User, id));
        let site_items = site_ids.iter().filter_map(|id| self.find(Side::Site, id));
        compute_chance(user_items, site_items)
    }

    /// Moves the items with `ids` from `from` to the end of the other side and
    /// returns how many moved. Ids not on `from` are left alone.
    pub fn transfer(&mut self, from: Side, ids: &[String]) -> usize {
        let mut moved = Vec::with_capacity(ids.len());
        let source = self.items_mut(from);
        for id in ids {
            if let Some(position) = source.iter().position(|item| &item.id == id) {
                moved.push(source.remove(position));
            }
        }

        let count = moved.len();
        self.items_mut(from.opposite()).extend(moved);
        count
    }
}
