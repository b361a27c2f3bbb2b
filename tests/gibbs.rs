//! Collapsed Gibbs sampling of a Normal mixture with a Pitman-Yor prior
use lace_conjugate::clustering::{
    count_assignments, sample_group, PitmanYor, PitmanYorMixture,
};
use lace_conjugate::nich;
use lace_conjugate::rv::dist::Gaussian;
use lace_conjugate::rv::traits::Rv;
use lace_conjugate::GroupT;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

struct Sampler {
    model: PitmanYor,
    shared: nich::Shared,
    clustering: PitmanYorMixture,
    mixture: nich::Mixture,
    asgn: Vec<usize>,
}

impl Sampler {
    fn new(model: PitmanYor, shared: nich::Shared, xs: &[f64]) -> Self {
        let mut group = nich::Group::new(&shared);
        xs.iter().for_each(|x| group.add_value(&shared, x));
        let groups = vec![group, nich::Group::new(&shared)];
        let mixture = nich::Mixture::from_groups(&shared, groups);
        let clustering =
            PitmanYorMixture::from_counts(&model, vec![xs.len(), 0]);
        Sampler {
            model,
            shared,
            clustering,
            mixture,
            asgn: vec![0; xs.len()],
        }
    }

    fn remove_group(&mut self, groupid: usize) {
        let last = self.mixture.len() - 1;
        self.mixture.remove_group(&self.shared, groupid);
        self.clustering.remove_group(&self.model, groupid);
        self.asgn.iter_mut().for_each(|z| {
            if *z == last {
                *z = groupid;
            }
        });
    }

    fn sweep<R: rand::Rng>(&mut self, xs: &[f64], rng: &mut R) {
        for (ix, x) in xs.iter().enumerate() {
            let z = self.asgn[ix];
            self.mixture.remove_value(&self.shared, z, x);
            self.clustering.remove_value(&self.model, z);
            if self.clustering.counts()[z] == 0 {
                self.remove_group(z);
            }

            let mut scores = vec![0.0; self.mixture.len()];
            self.clustering.score_value(&self.model, &mut scores);
            self.mixture.score_value(&self.shared, x, &mut scores);
            let k = sample_group(&scores, rng);

            let was_empty = self.clustering.counts()[k] == 0;
            self.mixture.add_value(&self.shared, k, x);
            self.clustering.add_value(&self.model, k);
            self.asgn[ix] = k;
            if was_empty {
                self.mixture.add_group(&self.shared);
                self.clustering.add_group(&self.model);
            }
        }
    }
}

#[test]
fn gibbs_separates_distant_clusters() {
    let mut rng = Xoshiro256Plus::seed_from_u64(0x5EED);
    let left = Gaussian::new(-10.0, 1.0).unwrap();
    let right = Gaussian::new(10.0, 1.0).unwrap();
    let xs: Vec<f64> = (0..100)
        .map(|ix| {
            let x: f64 = if ix % 2 == 0 {
                left.draw(&mut rng)
            } else {
                right.draw(&mut rng)
            };
            x
        })
        .collect();

    let model = PitmanYor::new(1.0, 0.1).unwrap();
    let shared = nich::Shared::new(0.0, 0.1, 1.0, 2.0).unwrap();
    let mut sampler = Sampler::new(model, shared, &xs);

    for _ in 0..20 {
        sampler.sweep(&xs, &mut rng);
    }

    let counts = sampler.clustering.counts();
    assert_eq!(counts.iter().filter(|&&count| count == 0).count(), 1);
    assert_eq!(sampler.clustering.sample_size(), xs.len());
    assert!(sampler.clustering.group_count() >= 2);
    for (group, &count) in sampler.mixture.groups().iter().zip(counts) {
        assert_eq!(group.count(), count);
    }
    let asgn_counts = count_assignments(sampler.asgn.iter());
    for (groupid, &count) in counts.iter().enumerate() {
        assert_eq!(asgn_counts.get(groupid).copied().unwrap_or(0), count);
    }

    // no group holds values from both clusters
    for groupid in 0..sampler.mixture.len() {
        let signs: Vec<bool> = xs
            .iter()
            .zip(sampler.asgn.iter())
            .filter(|(_, &z)| z == groupid)
            .map(|(&x, _)| x > 0.0)
            .collect();
        assert!(signs.iter().all(|&s| s) || signs.iter().all(|&s| !s));
    }
}
