use alloy::primitives::{Address, I256, U256};
use comet_action_engine::{
    models::{Action, Amount, BaseAsset, BaseAssetWithAccountState, BulkerConfig, CollateralAsset, Market, MarketId, Token, TokenWithAccountState},
    services::{calculate_updated_balances, compile, validate_adding_action},
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const USDC: Address = Address::repeat_byte(0x01);

fn int(value: i128) -> I256 {
    I256::try_from(value).unwrap()
}

fn fixture() -> (BaseAssetWithAccountState, Vec<TokenWithAccountState>) {
    let base = BaseAssetWithAccountState {
        asset: BaseAsset {
            token: Token::new(USDC, "USDC", "USD Coin", 6),
            price: int(100_000_000),
            min_borrow: int(100_000_000),
            balance_of_comet: int(100_000_000_000_000),
            price_adjustment: None,
        },
        balance: int(-5_000_000_000),
        wallet_balance: int(10_000_000_000),
        allowance: U256::MAX,
        bulker_allowance: U256::MAX,
        borrow_capacity: I256::ZERO,
    };

    // Eight collaterals, roughly a full mainnet market
    let collaterals = (0..8u8)
        .map(|i| TokenWithAccountState {
            asset: CollateralAsset {
                token: Token::new(Address::repeat_byte(0x10 + i), "COLL", "Collateral", 18),
                price: int(200_000_000_000),
                collateral_factor: int(800_000_000_000_000_000),
                liquidate_collateral_factor: int(850_000_000_000_000_000),
                liquidation_factor: int(950_000_000_000_000_000),
                supply_cap: int(1_000_000_000_000_000_000_000_000),
                total_supply: I256::ZERO,
            },
            balance: int(1_000_000_000_000_000_000),
            wallet_balance: int(1_000_000_000_000_000_000),
            allowance: U256::MAX,
            bulker_allowance: U256::MAX,
        })
        .collect();

    (base, collaterals)
}

fn queue(collaterals: &[TokenWithAccountState]) -> Vec<Action> {
    let mut actions: Vec<Action> = collaterals
        .iter()
        .map(|c| Action::SupplyCollateral { asset: c.address(), amount: Amount::exact(100_000_000_000_000_000) })
        .collect();
    actions.push(Action::Repay { asset: USDC, amount: Amount::Max });
    actions.push(Action::Supply { asset: USDC, amount: Amount::exact(1_000_000_000) });
    actions
}

fn benchmark_projection(c: &mut Criterion) {
    let (base, collaterals) = fixture();
    let actions = queue(&collaterals);

    c.bench_function("calculate_updated_balances", |b| {
        b.iter(|| calculate_updated_balances(black_box(&base), black_box(&collaterals), black_box(&actions)))
    });
}

fn benchmark_validation(c: &mut Criterion) {
    let (base, collaterals) = fixture();
    let actions = queue(&collaterals);
    let candidate = Action::WithdrawCollateral { asset: collaterals[0].address(), amount: Amount::Max };

    c.bench_function("validate_adding_action", |b| {
        b.iter(|| {
            validate_adding_action(
                black_box(&base),
                black_box(&collaterals),
                black_box(&actions),
                black_box(&candidate),
            )
        })
    });
}

fn benchmark_compile(c: &mut Criterion) {
    let (base, collaterals) = fixture();
    let actions = queue(&collaterals);
    let market = Market {
        id: MarketId::new(1, Address::repeat_byte(0xc0)),
        bulker: BulkerConfig {
            address: Address::repeat_byte(0xb0),
            supports_liquid_staking: true,
        },
        rewards: None,
    };

    c.bench_function("compile_bulker_transaction", |b| {
        b.iter(|| {
            compile(
                black_box(Address::repeat_byte(0xaa)),
                black_box(&market),
                black_box(&base),
                black_box(&collaterals),
                black_box(&actions),
            )
        })
    });
}

criterion_group!(benches, benchmark_projection, benchmark_validation, benchmark_compile);
criterion_main!(benches);
