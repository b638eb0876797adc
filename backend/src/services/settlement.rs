use rand::rngs::OsRng;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};
use upgrade_shared::constants::{ANGLE_DECIMALS, BASE_TURNS, MAX_EXTRA_TURNS, ROLL_DECIMALS};
use upgrade_shared::shared_upgrade_game::{compute_chance, round_to, Side, SpinError, SpinResult};
use upgrade_shared::validation::SpinClaim;
use crate::services::inventory_service::InventoryStore;

const SERVER_SEED_BYTES: usize = 16;

/// The random inputs of one settlement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Draw {
    /// Uniform in `[0, 100)`.
    pub roll: f64,
    pub extra_turns: u32,
}

impl Draw {
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            roll: rng.gen_range(0.0..100.0),
            extra_turns: rng.gen_range(0..=MAX_EXTRA_TURNS),
        }
    }

    /// Wheel rotation in degrees. Decorative; the outcome only depends on `roll`.
    pub fn angle(&self) -> f64 {
        (BASE_TURNS + self.extra_turns) as f64 * 360.0 + (self.roll / 100.0) * 360.0
    }
}

/// Seed, nonce and `sha256(seed ++ nonce)` returned with every settlement.
///
/// The seed is only revealed together with the outcome, so the client cannot
/// check it against an earlier commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FairnessProof {
    pub server_seed: String,
    pub nonce: String,
    pub proof: String,
}

impl FairnessProof {
    pub fn generate() -> Self {
        let mut seed = [0u8; SERVER_SEED_BYTES];
        OsRng.fill_bytes(&mut seed);
        let nonce = chrono::Utc::now().timestamp_millis().to_string();
        Self::from_parts(hex::encode(seed), nonce)
    }

    pub fn from_parts(server_seed: String, nonce: String) -> Self {
        let proof = hex::encode(Sha256::digest(format!("{}{}", server_seed, nonce).as_bytes()));
        Self { server_seed, nonce, proof }
    }
}

/// Settles `claim` against the store with fresh randomness.
pub fn settle<R: Rng>(
    store: &mut InventoryStore,
    claim: &SpinClaim,
    rng: &mut R,
) -> Result<SpinResult, SpinError> {
    settle_with(store, claim, Draw::random(rng), FairnessProof::generate())
}

/// Settles `claim` with a given draw. Nothing is mutated unless every claimed
/// id still resolves on its side.
pub fn settle_with(
    store: &mut InventoryStore,
    claim: &SpinClaim,
    draw: Draw,
    proof: FairnessProof,
) -> Result<SpinResult, SpinError> {
    let user_items = store
        .resolve(Side::User, &claim.user_item_ids)
        .ok_or(SpinError::StaleItems)?;
    let site_items = store
        .resolve(Side::Site, &claim.site_item_ids)
        .ok_or(SpinError::StaleItems)?;

    let chance = compute_chance(&user_items, &site_items);
    let win = draw.roll < chance;

    // The winner takes the losing side's stake; its own stake stays put.
    if win {
        store.transfer(Side::Site, &claim.site_item_ids);
    } else {
        store.transfer(Side::User, &claim.user_item_ids);
    }

    Ok(SpinResult {
        chance,
        win,
        roll: round_to(draw.roll, ROLL_DECIMALS),
        angle: round_to(draw.angle(), ANGLE_DECIMALS),
        proof: proof.proof,
        server_seed: proof.server_seed,
        nonce: proof.nonce,
        user_items,
        site_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::services::inventory_service::tests::{item, sample_store};

    fn claim(user: &[&str], site: &[&str]) -> SpinClaim {
        SpinClaim {
            user_item_ids: user.iter().map(|v| v.to_string()).collect(),
            site_item_ids: site.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn ids_on(store: &InventoryStore, side: Side) -> Vec<String> {
        store.items(side).iter().map(|i| i.id.clone()).collect()
    }

    fn proof() -> FairnessProof {
        FairnessProof::from_parts("00".repeat(16), "1700000000000".to_string())
    }

    #[test]
    fn test_win_moves_site_stake_to_user() {
        let mut store = sample_store();
        let draw = Draw { roll: 0.0, extra_turns: 0 };
        let result = settle_with(&mut store, &claim(&["u1"], &["s1", "s3"]), draw, proof()).unwrap();

        assert!(result.win);
        assert_eq!(ids_on(&store, Side::User), vec!["u1", "u2", "u3", "s1", "s3"]);
        assert_eq!(ids_on(&store, Side::Site), vec!["s2"]);
        assert_eq!(result.site_items.len(), 2);
        assert_eq!(store.total_items(), 6);
    }

    #[test]
    fn test_loss_moves_user_stake_to_site() {
        let mut store = sample_store();
        let draw = Draw { roll: 99.5, extra_turns: 3 };
        let result = settle_with(&mut store, &claim(&["u1", "u3"], &["s2"]), draw, proof()).unwrap();

        assert!(!result.win);
        assert_eq!(ids_on(&store, Side::User), vec!["u2"]);
        assert_eq!(ids_on(&store, Side::Site), vec!["s1", "s2", "s3", "u1", "u3"]);
        assert_eq!(store.total_items(), 6);
    }

    #[test]
    fn test_roll_equal_to_chance_loses() {
        let mut store = sample_store();
        // 1.00 / 4.00 -> 25%
        let draw = Draw { roll: 25.0, extra_turns: 1 };
        let result = settle_with(&mut store, &claim(&["u1"], &["s1"]), draw, proof()).unwrap();
        assert_eq!(result.chance, 25.0);
        assert!(!result.win);
    }

    #[test]
    fn test_stale_ids_leave_store_untouched() {
        let mut store = sample_store();
        let before = store.snapshot();
        let draw = Draw { roll: 0.0, extra_turns: 0 };

        let err = settle_with(&mut store, &claim(&["u1", "s1"], &["s2"]), draw, proof()).unwrap_err();
        assert_eq!(err, SpinError::StaleItems);
        let err = settle_with(&mut store, &claim(&["u1"], &["gone"]), draw, proof()).unwrap_err();
        assert_eq!(err, SpinError::StaleItems);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_worthless_stake_never_wins() {
        let mut store = InventoryStore::new(vec![item("free", 0)], vec![item("paid", 500)]);
        let draw = Draw { roll: 0.0, extra_turns: 0 };
        let result = settle_with(&mut store, &claim(&["free"], &["paid"]), draw, proof()).unwrap();
        assert_eq!(result.chance, 0.0);
        assert!(!result.win);
        assert_eq!(ids_on(&store, Side::Site), vec!["paid", "free"]);
    }

    #[test]
    fn test_result_rounding_and_angle() {
        let mut store = sample_store();
        let draw = Draw { roll: 50.123456, extra_turns: 2 };
        let result = settle_with(&mut store, &claim(&["u2"], &["s3"]), draw, proof()).unwrap();
        assert_eq!(result.roll, 50.1235);
        // 8 turns + 180.44 degrees
        assert_eq!(result.angle, 3060.44);
    }

    #[test]
    fn test_draws_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let draw = Draw::random(&mut rng);
            assert!((0.0..100.0).contains(&draw.roll));
            assert!(draw.extra_turns <= MAX_EXTRA_TURNS);
            assert!(draw.angle() >= 6.0 * 360.0 && draw.angle() < 10.0 * 360.0);
        }
    }

    #[test]
    fn test_random_settlements_conserve_items() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut store = sample_store();
        for _ in 0..50 {
            let user = ids_on(&store, Side::User);
            let site = ids_on(&store, Side::Site);
            if user.is_empty() || site.is_empty() {
                break;
            }
            let claim = SpinClaim {
                user_item_ids: vec![user[0].clone()],
                site_item_ids: vec![site[site.len() - 1].clone()],
            };
            settle(&mut store, &claim, &mut rng).unwrap();

            assert_eq!(store.total_items(), 6);
            let user = ids_on(&store, Side::User);
            assert!(ids_on(&store, Side::Site).iter().all(|id| !user.contains(id)));
        }
    }

    #[test]
    fn test_proof_matches_seed_and_nonce() {
        let generated = FairnessProof::generate();
        assert_eq!(generated.server_seed.len(), SERVER_SEED_BYTES * 2);
        assert_eq!(generated.proof.len(), 64);
        let recomputed = FairnessProof::from_parts(generated.server_seed.clone(), generated.nonce.clone());
        assert_eq!(recomputed, generated);

        let tampered = FairnessProof::from_parts(generated.server_seed.clone(), format!("{}1", generated.nonce));
        assert_ne!(tampered.proof, generated.proof);
    }
}
