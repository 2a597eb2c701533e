use crate::{
    context::{Context, DataPlugin},
    hashing::{hash_str, HashMap},
};
use log::trace;
use rand::{
    distr::{
        uniform::{SampleRange, SampleUniform},
        weighted::{Error as WeightError, WeightedIndex},
    },
    prelude::Distribution,
    seq::SliceRandom,
    Rng,
    SeedableRng,
};
use std::any::{Any, TypeId};

/// A named, independently seeded random number stream. Declare one with [`define_rng!`].
pub trait RngId: Any {
    #![allow(non_upper_case_globals)]
    const new: &'static dyn Fn(u64) -> Self;
    const name: &'static str;
    type RngType: SeedableRng;
    fn rng(&mut self) -> &mut Self::RngType;
}

struct RngPlugin {
    base_seed: u64,
    // This is actually a `HashMap<TypeId, Box<R: RngId>>`
    rng_map: HashMap<TypeId, Box<dyn Any>>,
}

impl RngPlugin {
    fn clear(&mut self) {
        self.rng_map.clear();
    }

    fn get_rng<R: RngId>(&mut self) -> &mut R::RngType {
        let base_seed = self.base_seed;
        self.rng_map
            .entry(TypeId::of::<R>())
            .or_insert_with(|| {
                let seed_offset = base_seed.wrapping_add(hash_str(R::name));
                Box::new((R::new)(seed_offset))
            })
            .downcast_mut::<R>()
            .unwrap() // Will never panic as only an `R` is stored under `TypeId::of::<R>()`
            .rng()
    }
}

impl DataPlugin for RngPlugin {
    #[allow(non_upper_case_globals)]
    const new: &'static dyn Fn() -> Self = &|| RngPlugin {
        base_seed: 0,
        rng_map: HashMap::default(),
    };
}

/// Gets a mutable reference to the random number generator associated with the given
/// `RngId`.
// This is a private free function so that it's not leaked to the public API.
fn get_rng<R: RngId>(context: &mut Context) -> &mut R::RngType {
    context.get_data_container_mut::<RngPlugin>().get_rng::<R>()
}

pub trait ContextRandomExt {
    /// Sets the base seed and drops every existing stream so that each is re-seeded on its
    /// next use.
    fn init_random(&mut self, base_seed: u64);

    fn base_random_seed(&self) -> Option<u64>;

    /// Gets a random sample from the random number generator associated with the given
    /// `RngId` by applying the specified sampler function. If the Rng has not been used
    /// before, one will be created with the base seed you defined in `init_random`.
    fn sample<R: RngId, T>(&mut self, sampler: impl FnOnce(&mut R::RngType) -> T) -> T;

    /// Gets a random sample from the specified distribution using a random number generator
    /// associated with the given `RngId`.
    fn sample_distr<R: RngId, T>(&mut self, distribution: impl Distribution<T>) -> T
    where
        R::RngType: Rng;

    /// Gets a random sample within the range provided by `range`
    /// using the generator associated with the given `RngId`.
    fn sample_range<R: RngId, S, T>(&mut self, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform;

    /// Draws a uniform value in `[0, 1)` and reports whether it fell below `p`. Values of `p`
    /// outside `[0, 1]` saturate and NaN never succeeds.
    fn sample_bool<R: RngId>(&mut self, p: f64) -> bool
    where
        R::RngType: Rng;

    /// Draws an index out of `weights` with probability proportional to its weight.
    fn sample_weighted<R: RngId>(&mut self, weights: &[f64]) -> Result<usize, WeightError>
    where
        R::RngType: Rng;

    /// Shuffles `values` in place with the generator associated with the given `RngId`.
    fn shuffle<R: RngId, T>(&mut self, values: &mut [T])
    where
        R::RngType: Rng;
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("initializing random module with base seed {base_seed}");
        let rng_container = self.get_data_container_mut::<RngPlugin>();
        rng_container.base_seed = base_seed;

        // Clear any existing Rngs to ensure they get re-seeded when `get_rng` is called
        rng_container.clear();
    }

    fn base_random_seed(&self) -> Option<u64> {
        self.get_data_container::<RngPlugin>()
            .map(|plugin| plugin.base_seed)
    }

    fn sample<R: RngId, T>(&mut self, sampler: impl FnOnce(&mut R::RngType) -> T) -> T {
        let rng = get_rng::<R>(self);
        sampler(rng)
    }

    fn sample_distr<R: RngId, T>(&mut self, distribution: impl Distribution<T>) -> T
    where
        R::RngType: Rng,
    {
        let rng = get_rng::<R>(self);
        distribution.sample::<R::RngType>(rng)
    }

    fn sample_range<R: RngId, S, T>(&mut self, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample::<R, T>(|rng| rng.random_range(range))
    }

    fn sample_bool<R: RngId>(&mut self, p: f64) -> bool
    where
        R::RngType: Rng,
    {
        self.sample::<R, bool>(|rng| rng.random::<f64>() < p)
    }

    fn sample_weighted<R: RngId>(&mut self, weights: &[f64]) -> Result<usize, WeightError>
    where
        R::RngType: Rng,
    {
        let index = WeightedIndex::<f64>::new(weights)?;
        let rng = get_rng::<R>(self);
        Ok(index.sample(rng))
    }

    fn shuffle<R: RngId, T>(&mut self, values: &mut [T])
    where
        R::RngType: Rng,
    {
        let rng = get_rng::<R>(self);
        values.shuffle(rng);
    }
}

#[macro_export]
macro_rules! define_rng {
    ($random_id:ident) => {
        $crate::define_rng!($random_id, $crate::rand::rngs::StdRng);
    };
    ($random_id:ident, $rng_type:ty) => {
        #[allow(dead_code)]
        pub(crate) struct $random_id {
            rng: $rng_type,
        }

        impl $crate::random::RngId for $random_id {
            #![allow(non_upper_case_globals)]
            type RngType = $rng_type;
            const name: &'static str = stringify!($random_id);
            const new: &'static dyn Fn(u64) -> Self = &|seed| {
                use $crate::rand::SeedableRng;
                Self {
                    rng: <$rng_type>::seed_from_u64(seed),
                }
            };

            fn rng(&mut self) -> &mut Self::RngType {
                &mut self.rng
            }
        }
    };
}
#[allow(unused_imports)]
pub use define_rng;

#[cfg(test)]
mod test {
    use crate::context::Context;
    use crate::random::ContextRandomExt;
    use rand::RngCore;
    use rand::distr::weighted::WeightedIndex;

    define_rng!(FooRng);
    define_rng!(BarRng);

    #[test]
    fn get_rng_basic() {
        let mut context = Context::new();
        context.init_random(42);

        assert_ne!(
            context.sample::<FooRng, _>(RngCore::next_u64),
            context.sample::<FooRng, _>(RngCore::next_u64)
        );
    }

    #[test]
    fn multiple_rng_types() {
        let mut context = Context::new();
        context.init_random(42);

        assert_ne!(
            context.sample::<FooRng, _>(RngCore::next_u64),
            context.sample::<BarRng, _>(RngCore::next_u64)
        );
    }

    #[test]
    fn reset_seed() {
        let mut context = Context::new();
        context.init_random(42);

        let run_0 = context.sample::<FooRng, _>(RngCore::next_u64);
        let run_1 = context.sample::<FooRng, _>(RngCore::next_u64);

        // Reset with same seed, ensure we get the same values
        context.init_random(42);
        assert_eq!(run_0, context.sample::<FooRng, _>(RngCore::next_u64));
        assert_eq!(run_1, context.sample::<FooRng, _>(RngCore::next_u64));

        // Reset with different seed, ensure we get different values
        context.init_random(88);
        assert_ne!(run_0, context.sample::<FooRng, _>(RngCore::next_u64));
        assert_ne!(run_1, context.sample::<FooRng, _>(RngCore::next_u64));
    }

    #[test]
    fn streams_do_not_perturb_each_other() {
        let mut lone = Context::new();
        lone.init_random(7);
        let expected = lone.sample::<FooRng, _>(RngCore::next_u64);

        let mut mixed = Context::new();
        mixed.init_random(7);
        let _ = mixed.sample::<BarRng, _>(RngCore::next_u64);
        assert_eq!(expected, mixed.sample::<FooRng, _>(RngCore::next_u64));
    }

    #[test]
    fn sample_distribution() {
        let mut context = Context::new();
        context.init_random(42);

        let wi = WeightedIndex::new(vec![1.0, 2.0]).unwrap();
        let n_samples = 3000;
        let mut zero_counter = 0;
        for _ in 0..n_samples {
            let sample = context.sample_distr::<FooRng, usize>(&wi);
            if sample == 0 {
                zero_counter += 1;
            }
        }
        assert!((zero_counter - 1000_i32).abs() < 100);
    }

    #[test]
    fn sample_range() {
        let mut context = Context::new();
        context.init_random(42);
        let result = context.sample_range::<FooRng, _, i32>(0..10);
        assert!((0..10).contains(&result));
    }

    #[test]
    fn sample_bool_saturates() {
        let mut context = Context::new();
        context.init_random(42);
        for _ in 0..100 {
            assert!(context.sample_bool::<FooRng>(1.0));
            assert!(!context.sample_bool::<FooRng>(0.0));
            assert!(!context.sample_bool::<FooRng>(f64::NAN));
        }
    }

    #[test]
    fn sample_weighted() {
        let mut context = Context::new();
        context.init_random(42);
        let r = context.sample_weighted::<FooRng>(&[0.1, 0.3, 0.4]).unwrap();
        assert!(r < 3);
        assert!(context.sample_weighted::<FooRng>(&[0.0, 0.0]).is_err());
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut context = Context::new();
        context.init_random(42);
        let mut values: Vec<u32> = (0..50).collect();
        context.shuffle::<FooRng, _>(&mut values);
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }
}
