use fnv::FnvHashMap;

/// Bijection between sparse external identifiers and dense internal indices,
/// built from a single pass over the rating triples. Users and items are
/// numbered independently, in first-seen order, starting at zero.
pub struct DataDictionary {
    user_dict: FnvHashMap<u32, u32>,
    item_dict: FnvHashMap<u32, u32>,
    user_ids: Vec<u32>,
    item_ids: Vec<u32>,
    num_ratings: u64,
}

impl DataDictionary {

    pub fn num_users(&self) -> usize {
        self.user_dict.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_dict.len()
    }

    pub fn num_ratings(&self) -> u64 {
        self.num_ratings
    }

    /// External user ids in internal-index order.
    pub fn user_ids(&self) -> &[u32] {
        &self.user_ids
    }

    /// External item ids in internal-index order.
    pub fn item_ids(&self) -> &[u32] {
        &self.item_ids
    }

    /// Strict lookup: every id passed here must have been seen during the
    /// dictionary pass, a miss is a bug in the caller.
    pub fn user_index(&self, external_id: u32) -> u32 {
        *self.user_dict.get(&external_id).unwrap()
    }

    pub fn item_index(&self, external_id: u32) -> u32 {
        *self.item_dict.get(&external_id).unwrap()
    }
}

impl DataDictionary {

    pub fn from_triples<T>(triples: T) -> Self
        where T: Iterator<Item=(u32, u32, f32)> {

        let mut user_dict: FnvHashMap<u32, u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());
        let mut item_dict: FnvHashMap<u32, u32> =
            FnvHashMap::with_capacity_and_hasher(100, Default::default());

        let mut user_ids: Vec<u32> = Vec::new();
        let mut item_ids: Vec<u32> = Vec::new();

        let mut num_ratings: u64 = 0;

        for (user, item, _rating) in triples {

            if !user_dict.contains_key(&user) {
                user_dict.insert(user, user_ids.len() as u32);
                user_ids.push(user);
            }

            if !item_dict.contains_key(&item) {
                item_dict.insert(item, item_ids.len() as u32);
                item_ids.push(item);
            }

            num_ratings += 1;
        }

        DataDictionary { user_dict, item_dict, user_ids, item_ids, num_ratings }
    }
}

/// Reverse direction of the dictionary: decodes internal indices back into
/// the external ids of the rating source.
pub struct Renaming {
    user_ids: Vec<u32>,
    item_ids: Vec<u32>,
}

impl Renaming {

    /// Builds the renaming from index tables that were previously persisted
    /// in internal-index order.
    pub fn new(user_ids: Vec<u32>, item_ids: Vec<u32>) -> Self {
        Renaming { user_ids, item_ids }
    }

    pub fn num_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn num_items(&self) -> usize {
        self.item_ids.len()
    }

    pub fn user_id(&self, user_index: u32) -> u32 {
        self.user_ids[user_index as usize]
    }

    pub fn item_id(&self, item_index: u32) -> u32 {
        self.item_ids[item_index as usize]
    }

    pub fn user_ids(&self) -> &[u32] {
        &self.user_ids
    }

    pub fn item_ids(&self) -> &[u32] {
        &self.item_ids
    }
}

impl From<DataDictionary> for Renaming {

    fn from(data_dict: DataDictionary) -> Self {
        Renaming {
            user_ids: data_dict.user_ids,
            item_ids: data_dict.item_ids,
        }
    }
}

#[cfg(test)]
mod tests {

    use super::DataDictionary;
    use stats::Renaming;

    #[test]
    fn indices_are_dense_and_first_seen_ordered() {

        let triples = vec![
            (1_u32, 10_u32, 5.0_f32),
            (1, 20, 3.0),
            (2, 10, 4.0),
            (2, 20, 4.0),
            (3, 10, 1.0),
        ];

        let data_dict = DataDictionary::from_triples(triples.into_iter());

        assert_eq!(data_dict.num_users(), 3);
        assert_eq!(data_dict.num_items(), 2);
        assert_eq!(data_dict.num_ratings(), 5);

        assert_eq!(data_dict.user_index(1), 0);
        assert_eq!(data_dict.user_index(2), 1);
        assert_eq!(data_dict.user_index(3), 2);
        assert_eq!(data_dict.item_index(10), 0);
        assert_eq!(data_dict.item_index(20), 1);

        assert_eq!(data_dict.user_ids(), &[1, 2, 3]);
        assert_eq!(data_dict.item_ids(), &[10, 20]);
    }

    #[test]
    fn indices_span_the_full_range_exactly_once() {

        let triples = (0..50).map(|n| (n * 7 + 3, n * 13 + 1, 1.0));
        let data_dict = DataDictionary::from_triples(triples);

        let mut seen_users = vec![false; data_dict.num_users()];
        for &id in data_dict.user_ids() {
            let index = data_dict.user_index(id) as usize;
            assert!(!seen_users[index]);
            seen_users[index] = true;
        }
        assert!(seen_users.into_iter().all(|seen| seen));
    }

    #[test]
    #[should_panic]
    fn unknown_id_lookup_is_a_bug() {
        let data_dict = DataDictionary::from_triples(vec![(1, 1, 1.0)].into_iter());
        data_dict.user_index(42);
    }

    #[test]
    fn renaming_restores_external_ids() {

        let triples = vec![(7_u32, 70_u32, 2.0_f32), (9, 90, 3.0)];
        let data_dict = DataDictionary::from_triples(triples.into_iter());

        let renaming: Renaming = data_dict.into();

        assert_eq!(renaming.user_id(0), 7);
        assert_eq!(renaming.user_id(1), 9);
        assert_eq!(renaming.item_id(0), 70);
        assert_eq!(renaming.item_id(1), 90);
    }
}
