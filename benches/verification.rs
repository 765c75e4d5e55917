use criterion::{criterion_group, criterion_main, Criterion};
use shuttle_core::action::{CreateObject, SendEvent};
use shuttle_core::code::{wrap, FORMAT_WASM, TEE_TYPE_SGX, WASM_MAGIC};
use shuttle_core::{decode_batch, encode_batch, Action, Env, MemoryState, Verifier, VerifierConfig};

fn create(i: usize) -> Action {
    Action::CreateObject(CreateObject {
        id: format!("obj-{}", i),
        code: wrap(FORMAT_WASM, 1, TEE_TYPE_SGX, &WASM_MAGIC),
        storage: vec![0; 64],
        region: None,
    })
}

fn event(i: usize) -> Action {
    Action::SendEvent(SendEvent {
        id_to: format!("obj-{}", i),
        function_call: "handle".to_string(),
        parameters: vec![1; 32],
        priority: 1,
        routes: vec![format!("obj-{}", i + 1)],
        attestations: None,
        timestamps: Vec::new(),
    })
}

fn bench_verification(c: &mut Criterion) {
    let verifier = Verifier::new(VerifierConfig::default()).unwrap();
    let state = MemoryState::new();
    let allow = |_: &[u8]| true;
    let env = Env::new(1_700_000_000, b"bench", &allow);

    let creates: Vec<Action> = (0..256).map(create).collect();
    c.bench_function("verify_batch_256_creates", |b| {
        b.iter(|| verifier.verify_batch(&creates, &env, &state).unwrap())
    });

    // 128 objects chained by 128 events
    let mut chain: Vec<Action> = (0..128).map(create).collect();
    chain.extend((0..128).map(event));
    c.bench_function("verify_batch_128_event_chain", |b| {
        b.iter(|| verifier.verify_batch(&chain, &env, &state).unwrap())
    });

    let encoded = encode_batch(&creates).unwrap();
    c.bench_function("decode_batch_256_creates", |b| {
        b.iter(|| decode_batch(&encoded).unwrap())
    });
}

criterion_group!(benches, bench_verification);
criterion_main!(benches);
