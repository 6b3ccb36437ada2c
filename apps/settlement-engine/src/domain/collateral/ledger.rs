//! Collateral Ledger
//!
//! The only component allowed to move custodied funds. State lives in an
//! explicit [`LedgerState`]; [`CollateralLedger`] wraps it in a mutex and
//! applies every operation all-or-nothing. Operations touch only the
//! entries they change.
//!
//! # Position lifecycle
//!
//! ```text
//! reserve ──commit──▶ escrow ──settle──▶ (credits)
//!    │
//!    └──abort──▶ (refunds)
//! ```
//!
//! `total_locked(asset)` counts the underlying notional of committed
//! escrows, independent of whether the escrow holds the raw asset (CALL) or
//! quote-currency proceeds (PUT).

use std::collections::{BTreeMap, HashMap};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::errors::LedgerError;
use crate::domain::shared::{Amount, AssetId, Identity, OptionId};

/// A quantity of a specific asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Asset held.
    pub asset: AssetId,
    /// Quantity held.
    pub quantity: Amount,
}

impl Holding {
    /// Create a holding.
    #[must_use]
    pub fn new(asset: AssetId, quantity: Amount) -> Self {
        Self { asset, quantity }
    }
}

/// Funds pulled from both parties while a take is in progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Option being opened.
    pub option_id: OptionId,
    /// Collateral provider.
    pub lp: Identity,
    /// Premium payer.
    pub taker: Identity,
    /// Collateral pulled from the LP.
    pub collateral: Holding,
    /// Premium pulled from the taker.
    pub premium: Holding,
}

/// Funds held against a TAKEN option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    /// Underlying the option is written on.
    pub underlying: AssetId,
    /// Underlying notional counted in `total_locked`.
    pub locked: Amount,
    /// What the escrow actually holds.
    pub holding: Holding,
}

/// A swap executed against an escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRecord {
    /// Taken out of the escrow and sent to the router.
    pub sold: Holding,
    /// Received from the router.
    pub bought: Holding,
}

/// A credit to a free balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    /// Receiving account.
    pub owner: Identity,
    /// Asset credited.
    pub asset: AssetId,
    /// Quantity credited.
    pub quantity: Amount,
}

impl Credit {
    /// Create a credit.
    #[must_use]
    pub fn new(owner: Identity, asset: AssetId, quantity: Amount) -> Self {
        Self {
            owner,
            asset,
            quantity,
        }
    }
}

/// Terminal release of an escrow.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionSettlement {
    /// Swap performed with the escrowed funds, if any.
    pub swap: Option<SwapRecord>,
    /// Where the escrow (after the swap) goes. Must account for every unit.
    pub credits: Vec<Credit>,
}

/// Raw ledger books.
///
/// Every operation validates and stages its changes before writing, so a
/// failing operation leaves the books untouched.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    balances: HashMap<(Identity, AssetId), Amount>,
    reservations: HashMap<OptionId, Reservation>,
    escrows: HashMap<OptionId, Escrow>,
    locked: HashMap<AssetId, Amount>,
}

impl LedgerState {
    /// Free balance of an account.
    #[must_use]
    pub fn balance(&self, owner: &Identity, asset: &AssetId) -> Amount {
        self.balances
            .get(&(owner.clone(), asset.clone()))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Total underlying notional locked by committed escrows.
    #[must_use]
    pub fn total_locked(&self, asset: &AssetId) -> Amount {
        self.locked.get(asset).copied().unwrap_or(Amount::ZERO)
    }

    /// Escrow of a committed position.
    #[must_use]
    pub fn escrow(&self, option_id: OptionId) -> Option<&Escrow> {
        self.escrows.get(&option_id)
    }

    /// Pending reservation of a take in progress.
    #[must_use]
    pub fn reservation(&self, option_id: OptionId) -> Option<&Reservation> {
        self.reservations.get(&option_id)
    }

    /// Everything the ledger custodies for `asset`: free balances, pending
    /// reservations and escrow holdings. `None` if the sum overflows.
    #[must_use]
    pub fn total_custodied(&self, asset: &AssetId) -> Option<Amount> {
        let free = self
            .balances
            .iter()
            .filter(|((_, a), _)| a == asset)
            .map(|(_, amount)| *amount);
        let reserved = self
            .reservations
            .values()
            .flat_map(|r| [&r.collateral, &r.premium])
            .filter(|h| &h.asset == asset)
            .map(|h| h.quantity);
        let escrowed = self
            .escrows
            .values()
            .filter(|e| &e.holding.asset == asset)
            .map(|e| e.holding.quantity);
        Amount::checked_sum(free.chain(reserved).chain(escrowed))
    }

    /// Check that each locked total equals the sum over its escrows.
    #[must_use]
    pub fn locked_totals_consistent(&self) -> bool {
        let mut expected: HashMap<&AssetId, Amount> = HashMap::new();
        for escrow in self.escrows.values() {
            let entry = expected.entry(&escrow.underlying).or_insert(Amount::ZERO);
            match entry.checked_add(escrow.locked) {
                Some(sum) => *entry = sum,
                None => return false,
            }
        }
        let nonzero_locked = self.locked.iter().filter(|(_, v)| !v.is_zero()).count();
        nonzero_locked == expected.values().filter(|v| !v.is_zero()).count()
            && expected
                .iter()
                .all(|(asset, amount)| self.total_locked(asset) == *amount)
    }

    /// Credit a free balance.
    ///
    /// Also used to seed books before handing them to a
    /// [`CollateralLedger`].
    ///
    /// # Errors
    ///
    /// `NonPositiveAmount`, or `Overflow` if the balance would leave the
    /// representable range.
    pub fn deposit(&mut self, owner: &Identity, asset: &AssetId, quantity: Amount) -> Result<(), LedgerError> {
        if !quantity.is_positive() {
            return Err(LedgerError::NonPositiveAmount { amount: quantity });
        }
        let mut staged = Staged::new(self);
        staged.credit(owner, asset, quantity)?;
        let writes = staged.into_writes();
        self.write(writes);
        Ok(())
    }

    fn withdraw(&mut self, owner: &Identity, asset: &AssetId, quantity: Amount) -> Result<(), LedgerError> {
        if !quantity.is_positive() {
            return Err(LedgerError::NonPositiveAmount { amount: quantity });
        }
        let mut staged = Staged::new(self);
        staged.debit(owner, asset, quantity)?;
        let writes = staged.into_writes();
        self.write(writes);
        Ok(())
    }

    fn reserve(&mut self, reservation: Reservation) -> Result<(), LedgerError> {
        let option_id = reservation.option_id;
        if self.reservations.contains_key(&option_id) || self.escrows.contains_key(&option_id) {
            return Err(LedgerError::DuplicatePosition { option_id });
        }

        let mut staged = Staged::new(self);
        staged
            .debit(
                &reservation.lp,
                &reservation.collateral.asset,
                reservation.collateral.quantity,
            )
            .map_err(|e| match e {
                LedgerError::InsufficientBalance {
                    owner,
                    asset,
                    required,
                    available,
                } => LedgerError::InsufficientCollateral {
                    owner,
                    asset,
                    required,
                    available,
                },
                other => other,
            })?;
        staged.debit(
            &reservation.taker,
            &reservation.premium.asset,
            reservation.premium.quantity,
        )?;

        let writes = staged.into_writes();
        self.write(writes);
        self.reservations.insert(option_id, reservation);
        Ok(())
    }

    fn commit(&mut self, option_id: OptionId, holding: Holding) -> Result<(), LedgerError> {
        let reservation = self
            .reservations
            .get(&option_id)
            .ok_or(LedgerError::UnknownPosition { option_id })?;

        // Premium passes straight through to the LP.
        let mut staged = Staged::new(self);
        staged.credit(
            &reservation.lp,
            &reservation.premium.asset,
            reservation.premium.quantity,
        )?;

        let underlying = reservation.collateral.asset.clone();
        let locked = reservation.collateral.quantity;
        let total = self
            .total_locked(&underlying)
            .checked_add(locked)
            .ok_or_else(|| LedgerError::Overflow {
                asset: underlying.clone(),
                quantity: "locked total".to_string(),
            })?;

        let writes = staged.into_writes();
        self.reservations.remove(&option_id);
        self.write(writes);
        self.locked.insert(underlying.clone(), total);
        self.escrows.insert(
            option_id,
            Escrow {
                underlying,
                locked,
                holding,
            },
        );
        Ok(())
    }

    fn abort(
        &mut self,
        option_id: OptionId,
        lp_refund: Option<&Holding>,
    ) -> Result<Reservation, LedgerError> {
        let reservation = self
            .reservations
            .get(&option_id)
            .ok_or(LedgerError::UnknownPosition { option_id })?;
        let refund = lp_refund.unwrap_or(&reservation.collateral);

        let mut staged = Staged::new(self);
        staged.credit(&reservation.lp, &refund.asset, refund.quantity)?;
        staged.credit(
            &reservation.taker,
            &reservation.premium.asset,
            reservation.premium.quantity,
        )?;

        let writes = staged.into_writes();
        let reservation = self
            .reservations
            .remove(&option_id)
            .ok_or(LedgerError::UnknownPosition { option_id })?;
        self.write(writes);
        Ok(reservation)
    }

    fn settle(
        &mut self,
        option_id: OptionId,
        settlement: &PositionSettlement,
    ) -> Result<Escrow, LedgerError> {
        let escrow = self
            .escrows
            .get(&option_id)
            .ok_or(LedgerError::UnknownPosition { option_id })?;

        let mut available: BTreeMap<AssetId, Amount> = BTreeMap::new();
        available.insert(escrow.holding.asset.clone(), escrow.holding.quantity);

        if let Some(swap) = &settlement.swap {
            if swap.sold.asset != escrow.holding.asset {
                return Err(LedgerError::EscrowMismatch {
                    option_id,
                    message: format!(
                        "swap sells {} but escrow holds {}",
                        swap.sold.asset, escrow.holding.asset
                    ),
                });
            }
            let remaining = escrow
                .holding
                .quantity
                .checked_sub(swap.sold.quantity)
                .ok_or_else(|| LedgerError::EscrowMismatch {
                    option_id,
                    message: format!(
                        "swap sells {} but escrow holds only {}",
                        swap.sold.quantity, escrow.holding.quantity
                    ),
                })?;
            available.insert(swap.sold.asset.clone(), remaining);
            add_to(&mut available, &swap.bought.asset, swap.bought.quantity, "swap proceeds")?;
        }

        let mut credited: BTreeMap<AssetId, Amount> = BTreeMap::new();
        for credit in &settlement.credits {
            if credit.quantity.is_negative() {
                return Err(LedgerError::NonPositiveAmount {
                    amount: credit.quantity,
                });
            }
            add_to(&mut credited, &credit.asset, credit.quantity, "settlement credits")?;
        }

        for asset in available.keys().chain(credited.keys()) {
            let have = available.get(asset).copied().unwrap_or(Amount::ZERO);
            let give = credited.get(asset).copied().unwrap_or(Amount::ZERO);
            if have != give {
                return Err(LedgerError::ConservationViolated {
                    asset: asset.clone(),
                    available: have,
                    credited: give,
                });
            }
        }

        let mut staged = Staged::new(self);
        for credit in &settlement.credits {
            staged.credit(&credit.owner, &credit.asset, credit.quantity)?;
        }

        let writes = staged.into_writes();
        let escrow = self
            .escrows
            .remove(&option_id)
            .ok_or(LedgerError::UnknownPosition { option_id })?;
        self.write(writes);
        if let Some(total) = self.locked.get_mut(&escrow.underlying) {
            *total = total.saturating_sub(escrow.locked);
        }
        Ok(escrow)
    }

    fn write(&mut self, balances: HashMap<(Identity, AssetId), Amount>) {
        self.balances.extend(balances);
    }
}

fn add_to(
    totals: &mut BTreeMap<AssetId, Amount>,
    asset: &AssetId,
    quantity: Amount,
    what: &str,
) -> Result<(), LedgerError> {
    let entry = totals.entry(asset.clone()).or_insert(Amount::ZERO);
    *entry = entry
        .checked_add(quantity)
        .ok_or_else(|| LedgerError::Overflow {
            asset: asset.clone(),
            quantity: what.to_string(),
        })?;
    Ok(())
}

/// Balance changes of one operation, read through to the books and written
/// back only once the operation succeeds.
struct Staged<'a> {
    books: &'a LedgerState,
    balances: HashMap<(Identity, AssetId), Amount>,
}

impl<'a> Staged<'a> {
    fn new(books: &'a LedgerState) -> Self {
        Self {
            books,
            balances: HashMap::new(),
        }
    }

    fn balance(&self, owner: &Identity, asset: &AssetId) -> Amount {
        self.balances
            .get(&(owner.clone(), asset.clone()))
            .copied()
            .unwrap_or_else(|| self.books.balance(owner, asset))
    }

    fn credit(&mut self, owner: &Identity, asset: &AssetId, quantity: Amount) -> Result<(), LedgerError> {
        if quantity.is_zero() {
            return Ok(());
        }
        let updated = self
            .balance(owner, asset)
            .checked_add(quantity)
            .ok_or_else(|| LedgerError::Overflow {
                asset: asset.clone(),
                quantity: format!("balance of {owner}"),
            })?;
        self.balances.insert((owner.clone(), asset.clone()), updated);
        Ok(())
    }

    fn debit(&mut self, owner: &Identity, asset: &AssetId, quantity: Amount) -> Result<(), LedgerError> {
        let available = self.balance(owner, asset);
        let remaining =
            available
                .checked_sub(quantity)
                .ok_or_else(|| LedgerError::InsufficientBalance {
                    owner: owner.clone(),
                    asset: asset.clone(),
                    required: quantity,
                    available,
                })?;
        self.balances.insert((owner.clone(), asset.clone()), remaining);
        Ok(())
    }

    fn into_writes(self) -> HashMap<(Identity, AssetId), Amount> {
        self.balances
    }
}

/// Thread-safe ledger applying each operation atomically.
#[derive(Debug, Default)]
pub struct CollateralLedger {
    state: Mutex<LedgerState>,
}

impl CollateralLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger over existing books.
    #[must_use]
    pub fn with_state(state: LedgerState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }

    fn transact<T>(
        &self,
        op: impl FnOnce(&mut LedgerState) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        op(&mut self.state.lock())
    }

    /// Credit a free balance.
    pub fn deposit(
        &self,
        owner: &Identity,
        asset: &AssetId,
        quantity: Amount,
    ) -> Result<(), LedgerError> {
        self.transact(|s| s.deposit(owner, asset, quantity))
    }

    /// Debit a free balance.
    pub fn withdraw(
        &self,
        owner: &Identity,
        asset: &AssetId,
        quantity: Amount,
    ) -> Result<(), LedgerError> {
        self.transact(|s| s.withdraw(owner, asset, quantity))
    }

    /// Pull collateral from the LP and premium from the taker.
    pub fn reserve(&self, reservation: Reservation) -> Result<(), LedgerError> {
        self.transact(|s| s.reserve(reservation))
    }

    /// Finish a take: pay the premium to the LP and lock the escrow.
    pub fn commit(&self, option_id: OptionId, holding: Holding) -> Result<(), LedgerError> {
        self.transact(|s| s.commit(option_id, holding))
    }

    /// Cancel a take, refunding both parties.
    pub fn abort(&self, option_id: OptionId) -> Result<Reservation, LedgerError> {
        self.transact(|s| s.abort(option_id, None))
    }

    /// Cancel a take whose collateral was already swapped, refunding the LP
    /// with the swap proceeds instead.
    pub fn abort_converted(
        &self,
        option_id: OptionId,
        proceeds: &Holding,
    ) -> Result<Reservation, LedgerError> {
        self.transact(|s| s.abort(option_id, Some(proceeds)))
    }

    /// Release an escrow according to `settlement`.
    pub fn settle(
        &self,
        option_id: OptionId,
        settlement: &PositionSettlement,
    ) -> Result<Escrow, LedgerError> {
        self.transact(|s| s.settle(option_id, settlement))
    }

    /// Free balance of an account.
    #[must_use]
    pub fn balance(&self, owner: &Identity, asset: &AssetId) -> Amount {
        self.state.lock().balance(owner, asset)
    }

    /// Locked underlying notional for an asset.
    #[must_use]
    pub fn total_locked(&self, asset: &AssetId) -> Amount {
        self.state.lock().total_locked(asset)
    }

    /// Escrow of a committed position.
    #[must_use]
    pub fn escrow(&self, option_id: OptionId) -> Option<Escrow> {
        self.state.lock().escrow(option_id).cloned()
    }

    /// Copy of the current books.
    #[must_use]
    pub fn snapshot(&self) -> LedgerState {
        self.state.lock().clone()
    }
}
