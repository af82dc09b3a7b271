use argon2_native::Argon2;

fn main() {
    let m_cost = 64 * 1024;
    let t_cost = 3;
    let p_cost = 4;

    let argon2 = Argon2::new(m_cost, t_cost, p_cost);
    let salt = argon2_native::generate_salt(16).unwrap();

    let time = std::time::Instant::now();
    let hash = argon2.hash_password(b"password", &salt).unwrap();
    println!("Hash: {:?}", hash);
    println!("Time to compute: {}secs", time.elapsed().as_secs_f32());

    let encoded = argon2.hash_password_phc(b"password").unwrap();
    println!("PHC string: {encoded}");
}
