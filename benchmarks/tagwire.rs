use crate::benchmarks::{calc_stats, scenarios, Scenario, StatResult, ThroughputResult};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Instant;
use tagwire::{Envelope, Message, Value};

pub fn run_tagwire_benchmark() -> (Vec<StatResult>, ThroughputResult) {
    let pure = run_pure();
    let net = run_network();
    let mut combined = pure;
    combined.extend(net.0);
    (combined, net.1)
}

fn run_pure() -> Vec<StatResult> {
    let scenarios = scenarios();
    let mut results = Vec::new();

    for scenario in scenarios {
        let encode_samples = benchmark_encode(&scenario, 5_000);
        let decode_samples = benchmark_decode(&scenario, 5_000);
        let (enc_avg, enc_min, enc_max, enc_p95, enc_p99) = calc_stats(encode_samples);
        let (dec_avg, dec_min, dec_max, dec_p95, dec_p99) = calc_stats(decode_samples);

        // For summary, average encode+decode
        let combined_avg = enc_avg + dec_avg;
        let combined_min = enc_min + dec_min;
        let combined_max = enc_max + dec_max;
        let combined_p95 = enc_p95 + dec_p95;
        let combined_p99 = enc_p99 + dec_p99;

        let size = envelope_size(&scenario);

        results.push(StatResult {
            scenario: format!("{} (pure)", scenario.name),
            avg_ms: combined_avg,
            min_ms: combined_min,
            max_ms: combined_max,
            p95_ms: combined_p95,
            p99_ms: combined_p99,
            size_bytes: size,
        });
    }

    results
}

fn run_network() -> (Vec<StatResult>, ThroughputResult) {
    let scenarios = scenarios();
    let listener = TcpListener::bind("127.0.0.1:4010").expect("bind tagwire");

    // Echo server thread
    let _server = thread::spawn(move || {
        for stream in listener.incoming() {
            if let Ok(mut stream) = stream {
                stream.set_nodelay(true).ok();
                thread::spawn(move || handle_client(&mut stream));
            }
        }
    });

    // Give server a moment
    std::thread::sleep(std::time::Duration::from_millis(100));

    let mut results = Vec::new();

    for scenario in &scenarios {
        let mut stream = TcpStream::connect("127.0.0.1:4010").expect("connect tagwire");
        stream.set_nodelay(true).expect("set_nodelay");
        let (avg, min, max, p95, p99) = benchmark_round_trip(&mut stream, scenario, 200);
        // The envelope header already frames the stream; no extra prefix.
        let size = envelope_size(scenario);
        results.push(StatResult {
            scenario: format!("{} (net)", scenario.name),
            avg_ms: avg,
            min_ms: min,
            max_ms: max,
            p95_ms: p95,
            p99_ms: p99,
            size_bytes: size,
        });
    }

    // Throughput test
    let mut stream = TcpStream::connect("127.0.0.1:4010").expect("connect tagwire throughput");
    stream.set_nodelay(true).expect("set_nodelay");
    let throughput = throughput_test(&mut stream, 1_000);

    (results, throughput)
}

/// Read one envelope off the stream. The 8-byte header carries the total
/// size, so no out-of-band framing is needed.
fn read_envelope(stream: &mut TcpStream, buf: &mut Vec<u8>) -> std::io::Result<()> {
    let mut header = [0u8; 8];
    stream.read_exact(&mut header)?;
    let total = u32::from_be_bytes([header[4], header[5], header[6], header[7]]) as usize;
    buf.resize(total, 0);
    buf[..8].copy_from_slice(&header);
    stream.read_exact(&mut buf[8..])?;
    Ok(())
}

fn handle_client(stream: &mut TcpStream) {
    let mut buf = Vec::with_capacity(8 * 1024);
    loop {
        if read_envelope(stream, &mut buf).is_err() {
            break;
        }

        // Decode then echo back same payload
        let _ = Envelope::decode(&buf);
        if stream.write_all(&buf).is_err() {
            break;
        }
        let _ = stream.flush();
    }
}

fn benchmark_encode(s: &Scenario, iterations: usize) -> Vec<f64> {
    let mut samples = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let env = Envelope::new(json_to_message(&s.payload));
        let start = Instant::now();
        let _ = env.encode().unwrap();
        samples.push(start.elapsed().as_secs_f64() * 1000.0);
    }
    samples
}

fn benchmark_decode(s: &Scenario, iterations: usize) -> Vec<f64> {
    let buffer = Envelope::new(json_to_message(&s.payload)).encode().unwrap();
    let mut samples = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let start = Instant::now();
        let _ = Envelope::decode(&buffer).unwrap();
        samples.push(start.elapsed().as_secs_f64() * 1000.0);
    }
    samples
}

fn benchmark_round_trip(
    stream: &mut TcpStream,
    s: &Scenario,
    iterations: usize,
) -> (f64, f64, f64, f64, f64) {
    let payload = Envelope::new(json_to_message(&s.payload)).encode().unwrap();

    let mut samples = Vec::with_capacity(iterations);
    let mut resp = Vec::new();

    for _ in 0..iterations {
        let start = Instant::now();
        stream.write_all(&payload).unwrap();

        read_envelope(stream, &mut resp).unwrap();
        let _ = Envelope::decode(&resp).unwrap();
        samples.push(start.elapsed().as_secs_f64() * 1000.0);
    }

    calc_stats(samples)
}

fn throughput_test(stream: &mut TcpStream, messages: usize) -> ThroughputResult {
    let base = json_to_message(&scenarios()[0].payload);

    let start = Instant::now();
    for i in 0..messages {
        // slightly vary data to avoid caching artifacts
        let mut msg = base.clone();
        msg.remove_by_name("playerId");
        msg.add("playerId", format!("player_{}", i % 1000));
        let buf = Envelope::new(msg).encode().unwrap();
        stream.write_all(&buf).unwrap();
    }

    let mut received = 0usize;
    let mut resp = Vec::new();
    while received < messages {
        if read_envelope(stream, &mut resp).is_err() {
            break;
        }
        received += 1;
    }
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;
    let throughput = messages as f64 / (elapsed / 1000.0);
    ThroughputResult {
        label: "Tagwire",
        throughput,
        total_time_ms: elapsed,
    }
}

fn envelope_size(s: &Scenario) -> usize {
    let env = Envelope::new(json_to_message(&s.payload));
    tagwire::envelope_size(&env, None, tagwire::TypeDictionary::standard()).unwrap()
}

/// Map a JSON object onto a message: members become named fields, arrays
/// become sub-messages of anonymous fields.
fn json_to_message(value: &serde_json::Value) -> Message {
    let mut msg = Message::new();
    match value {
        serde_json::Value::Object(map) => {
            for (k, v) in map {
                msg.add(k, json_to_value(v));
            }
        }
        serde_json::Value::Array(arr) => {
            for v in arr {
                msg.add_anonymous(json_to_value(v));
            }
        }
        other => {
            msg.add_anonymous(json_to_value(other));
        }
    }
    msg
}

fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Indicator,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else if let Some(f) = n.as_f64() {
                Value::number(f)
            } else {
                Value::Indicator
            }
        }
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            Value::Message(json_to_message(value))
        }
    }
}
