//! Declarations every engine starts with: fixed-width typedefs, the string
//! type, a sequence container and a callable wrapper.

use templar_core::RegistrationError;

use crate::DeclarationStore;

pub const PRELUDE: &str = r#"
typedef unsigned long size_t;
typedef long ptrdiff_t;
typedef signed char int8_t;
typedef short int16_t;
typedef int int32_t;
typedef long int64_t;
typedef unsigned char uint8_t;
typedef unsigned short uint16_t;
typedef unsigned int uint32_t;
typedef unsigned long uint64_t;

namespace std {
    typedef unsigned long size_t;
    typedef long ptrdiff_t;

    class string {
    public:
        string();
        string(const char* s);
        string(const string& other);
        size_t size() const;
        const char* c_str() const;
    };

    template<class T>
    struct allocator {
        typedef T value_type;
        allocator();
    };

    template<class T, class Allocator = allocator<T>>
    class [[templar::sequence]] vector {
    public:
        typedef T value_type;
        typedef size_t size_type;
        vector();
        explicit vector(size_t count);
        vector(const vector& other);
        size_t size() const;
        T& operator[](size_t pos);
        void push_back(const T& value);
    };

    template<class T1, class T2>
    struct pair {
        typedef T1 first_type;
        typedef T2 second_type;
        T1 first;
        T2 second;
        pair();
        pair(const T1& a, const T2& b);
    };

    template<class Signature>
    class [[templar::callable]] function;

    template<class R, class... Args>
    class [[templar::callable]] function<R(Args...)> {
    public:
        typedef R result_type;
        function();
        R operator()(Args... args) const;
    };
}
"#;

impl DeclarationStore {
    /// A store holding only the prelude.
    pub fn with_prelude() -> Result<Self, RegistrationError> {
        let mut store = DeclarationStore::new();
        store.register_source(PRELUDE)?;
        Ok(store)
    }
}
